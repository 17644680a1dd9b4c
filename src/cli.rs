use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "quilltip-highlights")]
#[command(about = "QuillTip highlights - identity hash backfill and rendering tools", long_about = None)]
pub struct Cli {
    /// Database URL, overriding DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize identity hash coverage without changing anything
    Audit,

    /// Show what a backfill would write
    DryRun,

    /// Backfill missing identity hashes
    Migrate {
        /// Records written per batch (defaults to MIGRATION_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Check backfilled records against ledger payments
    Validate {
        /// JSON array of payment records
        #[arg(long)]
        payments: Option<PathBuf>,
    },

    /// Compute the identity hash of a highlight
    Hash {
        /// Document reference (article slug)
        #[arg(long)]
        document: String,

        #[arg(long)]
        start: usize,

        #[arg(long)]
        end: usize,

        /// Highlighted text
        text: String,
    },

    /// Paint stored highlights onto an XHTML document and print the result
    Render {
        /// Document reference whose highlights are applied
        #[arg(long)]
        document: String,

        /// Tag of the element that holds the article text
        #[arg(long)]
        container: Option<String>,

        file: PathBuf,
    },
}
