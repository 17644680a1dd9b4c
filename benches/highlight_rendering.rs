use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quilltip_highlights::anchor::AnchoredPosition;
use quilltip_highlights::render::{HighlightRenderer, HighlightSegment, RendererConfig};
use quilltip_highlights::tree::{ContentTree, OrderedTree};

fn article(paragraphs: usize) -> ContentTree {
    let body: String = (0..paragraphs)
        .map(|i| format!("<p>Paragraph {i} carries a sentence worth highlighting.</p>"))
        .collect();
    ContentTree::parse_xhtml(&format!("<article>{body}</article>")).unwrap()
}

/// One highlight per paragraph, plus an overlapping one on every fourth.
fn segments(paragraphs: usize) -> Vec<HighlightSegment> {
    let mut segments = Vec::new();
    for i in 0..paragraphs {
        let path = format!("{i}.0");
        let mut push = |id: String, start: usize, end: usize| {
            segments.push(HighlightSegment {
                id,
                anchor: AnchoredPosition {
                    document_ref: "bench".into(),
                    text: String::new(),
                    start_offset: start,
                    end_offset: end,
                    start_path: path.clone(),
                    end_path: path.clone(),
                    text_digest: None,
                },
                color: None,
                note: None,
                user_name: None,
            })
        };
        push(format!("h{i}"), 0, 9);
        if i % 4 == 0 {
            push(format!("o{i}"), 5, 20);
        }
    }
    segments
}

/// Apply and clear a full article worth of highlights.
fn bench_apply_highlights(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_highlights");
    for paragraphs in [10, 100, 500] {
        let mut tree = article(paragraphs);
        let segments = segments(paragraphs);
        let root = tree.root();
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &segments, |b, segments| {
            let mut renderer = HighlightRenderer::new(root, RendererConfig::default());
            b.iter(|| {
                renderer.apply_highlights(&mut tree, segments);
                renderer.clear_highlights(&mut tree);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply_highlights);
criterion_main!(benches);
