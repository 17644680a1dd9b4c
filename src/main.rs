//! QuillTip highlights CLI
//!
//! Operator tooling around the highlight store: the identity hash backfill
//! phases, one-off hashing and offline rendering of stored highlights.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quilltip_highlights::config::Config;
use quilltip_highlights::db::{self, SqliteHighlightStore};
use quilltip_highlights::highlights::HighlightService;
use quilltip_highlights::identity;
use quilltip_highlights::ledger::InMemoryLedger;
use quilltip_highlights::migration::Backfill;
use quilltip_highlights::render::HighlightRenderer;
use quilltip_highlights::tree::{ContentTree, OrderedTree};

mod cli;

use cli::{Cli, Commands};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<SqliteHighlightStore> {
    db::open_store(&config.database.url)
        .await
        .with_context(|| format!("opening database {}", config.database.url))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "quilltip_highlights=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let cli = Cli::parse();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    match cli.command {
        Commands::Audit => {
            let store = open_store(&config).await?;
            print_json(&Backfill::new(&store).audit().await?)?;
        }
        Commands::DryRun => {
            let store = open_store(&config).await?;
            print_json(&Backfill::new(&store).dry_run().await?)?;
        }
        Commands::Migrate { batch_size } => {
            let store = open_store(&config).await?;
            let batch_size = batch_size.unwrap_or(config.migration.batch_size);
            print_json(&Backfill::new(&store).migrate(batch_size).await?)?;
        }
        Commands::Validate { payments } => {
            let ledger = match payments {
                Some(path) => {
                    let json = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    InMemoryLedger::from_json(&json)?
                }
                None => InMemoryLedger::new(),
            };
            let store = open_store(&config).await?;
            print_json(&Backfill::new(&store).validate(&ledger).await?)?;
        }
        Commands::Hash { document, start, end, text } => {
            let hash = identity::generate_async(&document, &text, start, end).await;
            print_json(&json!({
                "highlightId": hash,
                "canonicalInput": identity::canonical_input(&document, &text, start, end),
            }))?;
        }
        Commands::Render { document, container, file } => {
            let source = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let mut tree = ContentTree::parse_xhtml(&source)?;
            let root = match container.as_deref() {
                Some(tag) => tree
                    .find_element(tag)
                    .with_context(|| format!("no <{tag}> element in {}", file.display()))?,
                None => tree.root(),
            };

            let service = HighlightService::new(open_store(&config).await?);
            let segments = service.segments_for_document(&document).await?;

            let mut renderer = HighlightRenderer::new(root, config.renderer_config());
            let report = renderer.apply_highlights(&mut tree, &segments);
            tracing::info!(
                document = %document,
                rendered = report.rendered,
                skipped = report.skipped.len(),
                "Rendered highlights"
            );
            print_json(&json!({
                "report": report,
                "html": tree.to_html(tree.root()),
            }))?;
        }
    }

    Ok(())
}
