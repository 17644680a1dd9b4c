//! Highlight renderer

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::decoration::{decorate, undo, Decoration, PULSE_ATTRIBUTE};
use super::grouping::{group_overlapping, ResolvedSpan};
use super::types::{ApplyReport, HighlightSegment, RendererConfig};
use crate::anchor;
use crate::tree::{text_offset, RenderHost};

/// Applies and removes highlight decorations inside one container.
///
/// The renderer assumes it is the only writer of decorations in its
/// container. After any foreign structural edit call
/// [`notify_content_changed`](Self::notify_content_changed).
pub struct HighlightRenderer<N> {
    container: N,
    config: RendererConfig,
    decorations: Vec<Decoration<N>>,
    segments: Vec<HighlightSegment>,
    pulses: Vec<(N, Instant)>,
}

impl<N> HighlightRenderer<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    pub fn new(container: N, config: RendererConfig) -> Self {
        Self {
            container,
            config,
            decorations: Vec::new(),
            segments: Vec::new(),
            pulses: Vec::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn container(&self) -> N {
        self.container
    }

    /// Currently applied decorations, in document order
    pub fn decorations(&self) -> &[Decoration<N>] {
        &self.decorations
    }

    /// Replaces every decoration with ones for `segments`.
    ///
    /// Unresolvable records are skipped. A tree error while wrapping rolls
    /// the whole pass back and sets `aborted`.
    pub fn apply_highlights<T>(&mut self, tree: &mut T, segments: &[HighlightSegment]) -> ApplyReport
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        self.clear_highlights(tree);
        self.segments = segments.to_vec();

        let mut report = ApplyReport::default();
        let mut spans = Vec::with_capacity(segments.len());

        // Resolve everything before the first edit changes any path
        let view: &T = tree;
        for (index, segment) in segments.iter().enumerate() {
            let resolved = anchor::deserialize(view, self.container, &segment.anchor).and_then(|range| {
                let start = text_offset(view, self.container, range.start)?;
                let end = text_offset(view, self.container, range.end)?;
                Some((start, end))
            });
            match resolved {
                Some((start, end)) if start < end => spans.push(ResolvedSpan {
                    start,
                    end,
                    record: index,
                }),
                Some(_) => {
                    debug!(id = %segment.id, "Skipping empty highlight");
                    report.skipped.push(segment.id.clone());
                }
                None => {
                    debug!(id = %segment.id, "Highlight not resolvable in current content");
                    report.skipped.push(segment.id.clone());
                }
            }
        }

        for group in group_overlapping(spans) {
            match decorate(tree, self.container, &group, segments, &self.config) {
                Ok(decoration) => {
                    report.rendered += group.records.len();
                    self.decorations.push(decoration);
                }
                Err((e, edits, wrapper)) => {
                    error!(
                        error = %e,
                        start = group.start,
                        end = group.end,
                        "Content tree changed under the renderer, aborting pass"
                    );
                    undo(tree, wrapper, &edits);
                    self.clear_highlights(tree);
                    report.rendered = 0;
                    report.decorations = 0;
                    report.aborted = true;
                    return report;
                }
            }
        }

        report.decorations = self.decorations.len();
        info!(
            rendered = report.rendered,
            skipped = report.skipped.len(),
            decorations = report.decorations,
            "Applied highlights"
        );
        report
    }

    /// Removes every decoration. A no-op when nothing is applied.
    pub fn clear_highlights<T>(&mut self, tree: &mut T)
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        if self.decorations.is_empty() {
            return;
        }

        let mut failures = 0;
        while let Some(decoration) = self.decorations.pop() {
            failures += undo(tree, Some(decoration.wrapper), &decoration.edits);
        }
        self.pulses.clear();

        if failures > 0 {
            warn!(failures, "Some decorations could not be fully removed");
        } else {
            debug!("Cleared highlights");
        }
    }

    /// Re-applies the last record set after the content changed
    pub fn notify_content_changed<T>(&mut self, tree: &mut T) -> ApplyReport
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        let segments = std::mem::take(&mut self.segments);
        debug!(records = segments.len(), "Content changed, re-applying highlights");
        self.apply_highlights(tree, &segments)
    }

    /// Id of the decoration painted at viewport point `(x, y)`
    pub fn get_highlight_at_position<T>(&self, tree: &T, x: f64, y: f64) -> Option<String>
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        let mut current = tree.node_at_point(x, y)?;
        if !tree.contains(self.container, current) {
            return None;
        }
        loop {
            if let Some(id) = tree.attribute(current, &self.config.id_attribute) {
                return Some(id.to_string());
            }
            if current == self.container {
                return None;
            }
            current = tree.parent(current)?;
        }
    }

    /// Scrolls the decoration holding `id` into view and pulses it.
    ///
    /// Returns `false` when no rendered decoration contains that record.
    pub fn scroll_to_highlight<T>(&mut self, tree: &mut T, id: &str, now: Instant) -> bool
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        let Some(wrapper) = self
            .decorations
            .iter()
            .find(|d| d.id() == id)
            .or_else(|| self.decorations.iter().find(|d| d.covers(id)))
            .map(|d| d.wrapper)
        else {
            return false;
        };

        tree.scroll_into_view(wrapper);
        if let Err(e) = tree.set_attribute(wrapper, PULSE_ATTRIBUTE, "true") {
            warn!(error = %e, "Could not pulse highlight");
            return true;
        }
        self.pulses.retain(|(node, _)| *node != wrapper);
        self.pulses.push((wrapper, now + self.config.pulse));
        true
    }

    /// Ends pulses whose time is up
    pub fn tick<T>(&mut self, tree: &mut T, now: Instant)
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        self.pulses.retain(|&(node, until)| {
            if until > now {
                return true;
            }
            if let Err(e) = tree.remove_attribute(node, PULSE_ATTRIBUTE) {
                debug!(error = %e, "Pulse target vanished");
            }
            false
        });
    }

    /// Earliest pending pulse expiry
    pub fn next_tick(&self) -> Option<Instant> {
        self.pulses.iter().map(|(_, until)| *until).min()
    }

    /// Clears decorations and forgets the record set
    pub fn destroy<T>(&mut self, tree: &mut T)
    where
        T: RenderHost<Node = N> + ?Sized,
    {
        self.clear_highlights(tree);
        self.segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchoredPosition;
    use crate::tree::{ContentTree, MutableTree, NodeId, OrderedTree, Rect, TreeError};
    use std::time::Duration;

    const PLAIN: &str = "<article>012345678901234567890123456789 tail</article>";

    fn segment(id: &str, path: &str, start: usize, end: usize) -> HighlightSegment {
        HighlightSegment {
            id: id.to_string(),
            anchor: AnchoredPosition {
                document_ref: "doc".into(),
                text: String::new(),
                start_offset: start,
                end_offset: end,
                start_path: path.into(),
                end_path: path.into(),
                text_digest: None,
            },
            color: None,
            note: None,
            user_name: None,
        }
    }

    /// Content tree that refuses one wrap, or the attributes of one wrapper
    struct FailingHost {
        inner: ContentTree,
        wraps: usize,
        fail_wrap: Option<usize>,
        fail_attributes_of: Option<usize>,
    }

    impl FailingHost {
        fn new(source: &str) -> Self {
            Self {
                inner: ContentTree::parse_xhtml(source).unwrap(),
                wraps: 0,
                fail_wrap: None,
                fail_attributes_of: None,
            }
        }
    }

    impl OrderedTree for FailingHost {
        type Node = NodeId;

        fn root(&self) -> NodeId {
            self.inner.root()
        }

        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.inner.parent(node)
        }

        fn child_count(&self, node: NodeId) -> usize {
            self.inner.child_count(node)
        }

        fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
            self.inner.child(node, index)
        }

        fn text(&self, node: NodeId) -> Option<&str> {
            self.inner.text(node)
        }
    }

    impl MutableTree for FailingHost {
        fn split_text(&mut self, node: NodeId, at: usize) -> Result<NodeId, TreeError> {
            self.inner.split_text(node, at)
        }

        fn split_element(&mut self, node: NodeId, at: usize) -> Result<NodeId, TreeError> {
            self.inner.split_element(node, at)
        }

        fn wrap_children(
            &mut self,
            parent: NodeId,
            start: usize,
            end: usize,
            tag: &str,
        ) -> Result<NodeId, TreeError> {
            self.wraps += 1;
            if self.fail_wrap == Some(self.wraps) {
                return Err(TreeError::Incompatible("wrap refused".into()));
            }
            self.inner.wrap_children(parent, start, end, tag)
        }

        fn unwrap(&mut self, node: NodeId) -> Result<(), TreeError> {
            self.inner.unwrap(node)
        }

        fn merge_into_previous(&mut self, node: NodeId) -> Result<(), TreeError> {
            self.inner.merge_into_previous(node)
        }

        fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
            if self.fail_attributes_of == Some(self.wraps) && name != "class" {
                return Err(TreeError::Incompatible("attribute refused".into()));
            }
            self.inner.set_attribute(node, name, value)
        }

        fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), TreeError> {
            self.inner.remove_attribute(node, name)
        }

        fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
            self.inner.attribute(node, name)
        }
    }

    impl RenderHost for FailingHost {
        fn node_at_point(&self, x: f64, y: f64) -> Option<NodeId> {
            self.inner.node_at_point(x, y)
        }

        fn scroll_into_view(&mut self, node: NodeId) {
            self.inner.scroll_into_view(node)
        }
    }

    fn setup(source: &str) -> (ContentTree, HighlightRenderer<NodeId>) {
        let tree = ContentTree::parse_xhtml(source).unwrap();
        let renderer = HighlightRenderer::new(tree.root(), RendererConfig::default());
        (tree, renderer)
    }

    #[test]
    fn test_overlapping_records_share_one_decoration() {
        let (mut tree, mut renderer) = setup(PLAIN);
        let segments = vec![
            segment("a", "0", 0, 10),
            segment("b", "0", 5, 15),
            segment("c", "0", 20, 30),
        ];

        let report = renderer.apply_highlights(&mut tree, &segments);
        assert_eq!(report.decorations, 2);
        assert_eq!(report.rendered, 3);
        assert!(!report.aborted);

        let decorations = renderer.decorations();
        assert_eq!(decorations[0].range(), 0..15);
        assert_eq!(decorations[0].overlap_count(), 2);
        assert_eq!(decorations[0].id(), "a");
        assert_eq!(decorations[1].range(), 20..30);
        assert_eq!(decorations[1].overlap_count(), 1);

        let wrapper = decorations[0].wrapper;
        assert_eq!(tree.text_content(wrapper), "012345678901234");
        assert_eq!(tree.attribute(wrapper, "data-overlap-count"), Some("2"));
        assert_eq!(tree.attribute(wrapper, "data-highlight-id"), Some("a"));
        assert_eq!(tree.attribute(wrapper, "class"), Some("text-highlight"));
    }

    #[test]
    fn test_apply_then_clear_preserves_content() {
        let source = "<div><p>The <em>quick</em> brown</p><p>fox <b>jumps</b></p></div>";
        let (mut tree, mut renderer) = setup(source);
        let root = tree.root();
        let before = tree.text_content(root);
        let segments = vec![
            HighlightSegment {
                anchor: AnchoredPosition {
                    end_path: "1.1.0".into(),
                    ..segment("x", "0.1.0", 2, 3).anchor
                },
                ..segment("x", "0.1.0", 2, 3)
            },
            segment("y", "0.0", 0, 2),
        ];

        let report = renderer.apply_highlights(&mut tree, &segments);
        assert_eq!(report.decorations, 2);
        assert_eq!(tree.text_content(root), before);

        renderer.clear_highlights(&mut tree);
        assert_eq!(tree.text_content(root), before);
        assert_eq!(tree.to_html(root), source);

        // Second clear is a no-op
        renderer.clear_highlights(&mut tree);
        assert_eq!(tree.to_html(root), source);
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let (mut tree, mut renderer) = setup(PLAIN);
        let root = tree.root();
        let segments = vec![segment("a", "0", 3, 8)];

        renderer.apply_highlights(&mut tree, &segments);
        let first = tree.to_html(root);
        renderer.apply_highlights(&mut tree, &segments);
        assert_eq!(tree.to_html(root), first);
        assert_eq!(renderer.decorations().len(), 1);
    }

    #[test]
    fn test_unresolvable_record_is_skipped() {
        let (mut tree, mut renderer) = setup("<div><p>alpha beta</p><p>gamma delta</p></div>");
        let segments = vec![
            segment("ok1", "0.0", 0, 5),
            segment("bad", "0.4", 0, 3),
            segment("ok2", "1.0", 6, 11),
        ];

        let report = renderer.apply_highlights(&mut tree, &segments);
        assert_eq!(report.skipped, vec!["bad".to_string()]);
        assert_eq!(report.rendered, 2);
        assert_eq!(report.decorations, 2);
    }

    #[test]
    fn test_overlap_count_is_capped() {
        let (mut tree, mut renderer) = setup(PLAIN);
        let segments: Vec<_> = (0..7)
            .map(|i| segment(&format!("h{i}"), "0", i, i + 10))
            .collect();

        renderer.apply_highlights(&mut tree, &segments);
        let decoration = &renderer.decorations()[0];
        assert_eq!(decoration.overlap_count(), 5);
        assert_eq!(decoration.record_ids().len(), 7);
    }

    #[test]
    fn test_tooltip_and_colour_come_from_records() {
        let (mut tree, mut renderer) = setup(PLAIN);
        let mut first = segment("a", "0", 0, 4);
        first.user_name = Some("Ada".into());
        first.note = Some("nice".into());
        first.color = Some("#00FF00".into());
        let second = segment("b", "0", 2, 6);

        renderer.apply_highlights(&mut tree, &[first, second]);
        let wrapper = renderer.decorations()[0].wrapper;
        assert_eq!(tree.attribute(wrapper, "title"), Some("Ada: nice\nAnonymous"));
        assert_eq!(
            tree.attribute(wrapper, "style"),
            Some("background-color: #00FF0058; border-bottom: 2px solid #00FF00")
        );
    }

    #[test]
    fn test_hit_testing_finds_decoration() {
        let (mut tree, mut renderer) = setup("<p>Hello brave world</p>");
        let root = tree.root();
        renderer.apply_highlights(&mut tree, &[segment("brave", "0", 6, 11)]);

        let wrapper = renderer.decorations()[0].wrapper;
        let inner = tree.child(wrapper, 0).unwrap();
        tree.set_layout(root, Rect::new(0.0, 0.0, 300.0, 20.0)).unwrap();
        tree.set_layout(inner, Rect::new(50.0, 0.0, 40.0, 20.0)).unwrap();

        assert_eq!(
            renderer.get_highlight_at_position(&tree, 60.0, 10.0).as_deref(),
            Some("brave")
        );
        assert_eq!(renderer.get_highlight_at_position(&tree, 10.0, 10.0), None);
        assert_eq!(renderer.get_highlight_at_position(&tree, 999.0, 10.0), None);
    }

    #[test]
    fn test_scroll_to_highlight_pulses_then_expires() {
        let (mut tree, mut renderer) = setup(PLAIN);
        renderer.apply_highlights(&mut tree, &[segment("a", "0", 0, 4), segment("b", "0", 2, 6)]);
        let wrapper = renderer.decorations()[0].wrapper;
        let t0 = Instant::now();

        assert!(renderer.scroll_to_highlight(&mut tree, "b", t0));
        assert_eq!(tree.attribute(wrapper, "data-pulse"), Some("true"));

        renderer.tick(&mut tree, t0 + Duration::from_millis(200));
        assert_eq!(tree.attribute(wrapper, "data-pulse"), Some("true"));

        renderer.tick(&mut tree, t0 + Duration::from_millis(500));
        assert_eq!(tree.attribute(wrapper, "data-pulse"), None);
        assert_eq!(renderer.next_tick(), None);

        assert!(!renderer.scroll_to_highlight(&mut tree, "missing", t0));
    }

    #[test]
    fn test_foreign_edit_then_notify_recovers() {
        let (mut tree, mut renderer) = setup("<div><p>alpha beta</p><p>gamma</p></div>");
        let root = tree.root();
        let segments = vec![segment("a", "0.0", 6, 10), segment("g", "1.0", 0, 5)];
        renderer.apply_highlights(&mut tree, &segments);

        // Someone else appends a paragraph
        let p = tree.append_element(root, "p").unwrap();
        tree.append_text(p, "delta").unwrap();

        let report = renderer.notify_content_changed(&mut tree);
        assert_eq!(report.decorations, 2);
        assert!(tree.text_content(root).ends_with("delta"));

        renderer.destroy(&mut tree);
        assert_eq!(
            tree.to_html(root),
            "<div><p>alpha beta</p><p>gamma</p><p>delta</p></div>"
        );
        assert!(renderer.notify_content_changed(&mut tree).decorations == 0);
    }

    #[test]
    fn test_failed_wrap_rolls_back_the_whole_pass() {
        let mut host = FailingHost::new(PLAIN);
        host.fail_wrap = Some(2);
        let root = host.root();
        let mut renderer = HighlightRenderer::new(root, RendererConfig::default());
        let segments = vec![segment("a", "0", 0, 4), segment("c", "0", 20, 30)];

        let report = renderer.apply_highlights(&mut host, &segments);
        assert!(report.aborted);
        assert_eq!(report.rendered, 0);
        assert_eq!(report.decorations, 0);
        assert!(renderer.decorations().is_empty());
        assert_eq!(host.inner.to_html(root), PLAIN);
        assert_eq!(renderer.get_highlight_at_position(&host, 0.0, 0.0), None);
    }

    #[test]
    fn test_failed_attribute_unwraps_the_new_wrapper() {
        let mut host = FailingHost::new(PLAIN);
        host.fail_attributes_of = Some(2);
        let root = host.root();
        let mut renderer = HighlightRenderer::new(root, RendererConfig::default());
        let segments = vec![segment("a", "0", 0, 4), segment("c", "0", 20, 30)];

        let report = renderer.apply_highlights(&mut host, &segments);
        assert!(report.aborted);
        assert!(renderer.decorations().is_empty());
        assert_eq!(host.inner.to_html(root), PLAIN);
    }

    #[test]
    fn test_empty_record_set() {
        let (mut tree, mut renderer) = setup(PLAIN);
        let report = renderer.apply_highlights(&mut tree, &[]);
        assert_eq!(report, ApplyReport::default());
    }
}
