//! In-memory content tree
//!
//! An arena of element and text nodes with optional layout boxes, a
//! selection and a scroll position. It is what the CLI renders XHTML
//! chapters into, and what the tests drive capture and rendering against.

use super::{LiveRange, MutableTree, OrderedTree, RenderHost, SelectionSource, TreeError};

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

/// Handle to a node in a [`ContentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

/// Layout box in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Option<Rect>,
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    selection: Option<LiveRange<NodeId>>,
    viewport: Rect,
    scroll_top: f64,
}

impl ContentTree {
    /// Creates a tree holding a single empty `root_tag` element
    pub fn new(root_tag: &str) -> Self {
        let root = NodeData {
            kind: NodeKind::Element {
                tag: root_tag.to_string(),
                attributes: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
            layout: None,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            selection: None,
            viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
            scroll_top: 0.0,
        }
    }

    /// Parses an XHTML fragment or document. Comments and processing
    /// instructions are dropped; whitespace text is kept as-is.
    pub fn parse_xhtml(input: &str) -> Result<Self, TreeError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(input, options)
            .map_err(|e| TreeError::Parse(e.to_string()))?;

        let root_element = doc.root_element();
        let mut tree = Self::new(root_element.tag_name().name());
        let root = tree.root;
        if let NodeKind::Element { attributes, .. } = &mut tree.nodes[0].kind {
            *attributes = copy_attributes(&root_element);
        }

        let mut stack = vec![(root_element, root)];
        while let Some((source, target)) = stack.pop() {
            for child in source.children() {
                if child.is_element() {
                    let id = tree.append_element(target, child.tag_name().name())?;
                    if let NodeKind::Element { attributes, .. } = &mut tree.nodes[id.0].kind {
                        *attributes = copy_attributes(&child);
                    }
                    stack.push((child, id));
                } else if child.is_text() {
                    if let Some(text) = child.text() {
                        tree.append_text(target, text)?;
                    }
                }
            }
        }

        Ok(tree)
    }

    fn data(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes
            .get(node.0)
            .ok_or_else(|| TreeError::UnknownNode(node.to_string()))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes
            .get_mut(node.0)
            .ok_or_else(|| TreeError::UnknownNode(node.to_string()))
    }

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>, layout: Option<Rect>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
            layout,
        });
        id
    }

    fn require_element(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        let data = self.data(node)?;
        match data.kind {
            NodeKind::Element { .. } => Ok(data),
            NodeKind::Text(_) => Err(TreeError::NotElement(node.to_string())),
        }
    }

    fn parent_and_index(&self, node: NodeId) -> Result<(NodeId, usize), TreeError> {
        let parent = self
            .data(node)?
            .parent
            .ok_or_else(|| TreeError::Detached(node.to_string()))?;
        let index = self
            .data(parent)?
            .children
            .iter()
            .position(|&c| c == node)
            .ok_or_else(|| TreeError::Detached(node.to_string()))?;
        Ok((parent, index))
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, TreeError> {
        self.require_element(parent)?;
        let id = self.push_node(kind, Some(parent), None);
        self.data_mut(parent)?.children.push(id);
        Ok(id)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, TreeError> {
        self.append(
            parent,
            NodeKind::Element {
                tag: tag.to_string(),
                attributes: Vec::new(),
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, TreeError> {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    /// Replaces the text of a text leaf
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Text(current) => {
                *current = text.to_string();
                Ok(())
            }
            NodeKind::Element { .. } => Err(TreeError::NotText(node.to_string())),
        }
    }

    /// Detaches and returns child `index` of `parent`
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let len = self.require_element(parent)?.children.len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        let child = self.data_mut(parent)?.children.remove(index);
        self.data_mut(child)?.parent = None;
        Ok(child)
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|d| &d.kind)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// First element named `tag` in document order
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.tag(n) == Some(tag))
    }

    /// `node` and everything under it, in document order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(data) = self.nodes.get(current.0) else {
                continue;
            };
            out.push(current);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    pub fn set_layout(&mut self, node: NodeId, rect: Rect) -> Result<(), TreeError> {
        self.data_mut(node)?.layout = Some(rect);
        Ok(())
    }

    pub fn layout(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(node.0).and_then(|d| d.layout)
    }

    /// Sets (or clears) the user's selection
    pub fn select(&mut self, range: Option<LiveRange<NodeId>>) {
        self.selection = range;
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Serializes `node` and its subtree as XHTML
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                if data.children.is_empty() && VOID_ELEMENTS.contains(&tag.as_str()) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in &data.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }
}

fn copy_attributes(node: &roxmltree::Node) -> Vec<(String, String)> {
    node.attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

impl OrderedTree for ContentTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|d| d.parent)
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.nodes.get(node.0).map_or(0, |d| d.children.len())
    }

    fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.nodes
            .get(node.0)
            .and_then(|d| d.children.get(index).copied())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        self.parent_and_index(node).ok().map(|(_, index)| index)
    }
}

impl MutableTree for ContentTree {
    fn split_text(&mut self, node: NodeId, at: usize) -> Result<NodeId, TreeError> {
        let data = self.data(node)?;
        let NodeKind::Text(text) = &data.kind else {
            return Err(TreeError::NotText(node.to_string()));
        };
        let len = text.chars().count();
        if at > len {
            return Err(TreeError::IndexOutOfBounds { index: at, len });
        }
        let byte = text.char_indices().nth(at).map_or(text.len(), |(i, _)| i);
        let tail = text[byte..].to_string();
        let layout = data.layout;
        let (parent, index) = self.parent_and_index(node)?;

        if let NodeKind::Text(text) = &mut self.data_mut(node)?.kind {
            text.truncate(byte);
        }
        let new = self.push_node(NodeKind::Text(tail), Some(parent), layout);
        self.data_mut(parent)?.children.insert(index + 1, new);
        Ok(new)
    }

    fn split_element(&mut self, node: NodeId, at: usize) -> Result<NodeId, TreeError> {
        let data = self.require_element(node)?;
        let len = data.children.len();
        if at > len {
            return Err(TreeError::IndexOutOfBounds { index: at, len });
        }
        let kind = data.kind.clone();
        let layout = data.layout;
        let (parent, index) = self.parent_and_index(node)?;

        let moved: Vec<NodeId> = self.data_mut(node)?.children.drain(at..).collect();
        let clone = self.push_node(kind, Some(parent), layout);
        for &child in &moved {
            self.data_mut(child)?.parent = Some(clone);
        }
        self.data_mut(clone)?.children = moved;
        self.data_mut(parent)?.children.insert(index + 1, clone);
        Ok(clone)
    }

    fn wrap_children(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
        tag: &str,
    ) -> Result<NodeId, TreeError> {
        let len = self.require_element(parent)?.children.len();
        if start > end || end > len {
            return Err(TreeError::IndexOutOfBounds { index: end, len });
        }

        let moved: Vec<NodeId> = self.data_mut(parent)?.children.drain(start..end).collect();
        let wrapper = self.push_node(
            NodeKind::Element {
                tag: tag.to_string(),
                attributes: Vec::new(),
            },
            Some(parent),
            None,
        );
        for &child in &moved {
            self.data_mut(child)?.parent = Some(wrapper);
        }
        self.data_mut(wrapper)?.children = moved;
        self.data_mut(parent)?.children.insert(start, wrapper);
        Ok(wrapper)
    }

    fn unwrap(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.require_element(node)?;
        let (parent, index) = self.parent_and_index(node)?;

        let children = std::mem::take(&mut self.data_mut(node)?.children);
        for &child in &children {
            self.data_mut(child)?.parent = Some(parent);
        }
        let siblings = &mut self.data_mut(parent)?.children;
        siblings.splice(index..=index, children);
        self.data_mut(node)?.parent = None;
        Ok(())
    }

    fn merge_into_previous(&mut self, node: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.parent_and_index(node)?;
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.child(parent, i))
            .ok_or_else(|| TreeError::Incompatible(format!("{node} has no previous sibling")))?;

        match (self.data(previous)?.kind.clone(), self.data(node)?.kind.clone()) {
            (NodeKind::Text(_), NodeKind::Text(tail)) => {
                if let NodeKind::Text(head) = &mut self.data_mut(previous)?.kind {
                    head.push_str(&tail);
                }
            }
            (NodeKind::Element { tag: a, .. }, NodeKind::Element { tag: b, .. }) if a == b => {
                let children = std::mem::take(&mut self.data_mut(node)?.children);
                for &child in &children {
                    self.data_mut(child)?.parent = Some(previous);
                }
                self.data_mut(previous)?.children.extend(children);
            }
            _ => {
                return Err(TreeError::Incompatible(format!(
                    "cannot merge {node} into {previous}"
                )))
            }
        }

        self.data_mut(parent)?.children.remove(index);
        self.data_mut(node)?.parent = None;
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(n, _)| n == name) {
                    Some(existing) => existing.1 = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            NodeKind::Text(_) => Err(TreeError::NotElement(node.to_string())),
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), TreeError> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element { attributes, .. } => {
                attributes.retain(|(n, _)| n != name);
                Ok(())
            }
            NodeKind::Text(_) => Err(TreeError::NotElement(node.to_string())),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }
}

impl RenderHost for ContentTree {
    fn node_at_point(&self, x: f64, y: f64) -> Option<NodeId> {
        let doc_y = y + self.scroll_top;
        let mut best: Option<(usize, NodeId)> = None;
        for node in self.descendants(self.root) {
            let Some(rect) = self.layout(node) else {
                continue;
            };
            if !rect.contains(x, doc_y) {
                continue;
            }
            let depth = self.depth(node);
            if best.map_or(true, |(d, _)| depth >= d) {
                best = Some((depth, node));
            }
        }
        best.map(|(_, node)| node)
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        let bounds = self
            .descendants(node)
            .into_iter()
            .filter_map(|n| self.layout(n))
            .reduce(|acc, r| acc.union(&r));
        if let Some(bounds) = bounds {
            let centre = bounds.y + bounds.height / 2.0;
            self.scroll_top = (centre - self.viewport.height / 2.0).max(0.0);
        }
    }
}

impl SelectionSource for ContentTree {
    fn current_selection(&self) -> Option<LiveRange<NodeId>> {
        self.selection
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xhtml_keeps_text_and_attributes() {
        let tree = ContentTree::parse_xhtml(
            r#"<section id="ch1"><p class="lead">A &amp; B</p><!-- note --><p>C</p></section>"#,
        )
        .unwrap();
        let root = tree.root();
        assert_eq!(tree.tag(root), Some("section"));
        assert_eq!(tree.attribute(root, "id"), Some("ch1"));
        assert_eq!(tree.child_count(root), 2);
        assert_eq!(tree.text_content(root), "A & BC");
    }

    #[test]
    fn test_parse_xhtml_rejects_malformed_input() {
        let err = ContentTree::parse_xhtml("<p>unclosed").unwrap_err();
        assert!(matches!(err, TreeError::Parse(_)));
    }

    #[test]
    fn test_split_text_inserts_tail_sibling() {
        let mut tree = ContentTree::new("p");
        let root = tree.root();
        let leaf = tree.append_text(root, "naïve text").unwrap();

        let tail = tree.split_text(leaf, 5).unwrap();
        assert_eq!(tree.text(leaf), Some("naïve"));
        assert_eq!(tree.text(tail), Some(" text"));
        assert_eq!(tree.index_in_parent(tail), Some(1));

        let err = tree.split_text(leaf, 9).unwrap_err();
        assert!(matches!(err, TreeError::IndexOutOfBounds { index: 9, len: 5 }));
    }

    #[test]
    fn test_split_element_moves_trailing_children() {
        let mut tree = ContentTree::parse_xhtml("<div><em>one<b>two</b>three</em></div>").unwrap();
        let root = tree.root();
        let em = tree.child(root, 0).unwrap();

        let clone = tree.split_element(em, 1).unwrap();
        assert_eq!(
            tree.to_html(root),
            "<div><em>one</em><em><b>two</b>three</em></div>"
        );

        tree.merge_into_previous(clone).unwrap();
        assert_eq!(tree.to_html(root), "<div><em>one<b>two</b>three</em></div>");
    }

    #[test]
    fn test_wrap_and_unwrap_restore_markup() {
        let mut tree = ContentTree::parse_xhtml("<p>a<i>b</i>c</p>").unwrap();
        let root = tree.root();
        let before = tree.to_html(root);

        let mark = tree.wrap_children(root, 1, 3, "mark").unwrap();
        tree.set_attribute(mark, "title", "x \"y\"").unwrap();
        assert_eq!(
            tree.to_html(root),
            "<p>a<mark title=\"x &quot;y&quot;\"><i>b</i>c</mark></p>"
        );

        tree.unwrap(mark).unwrap();
        assert_eq!(tree.to_html(root), before);
        assert_eq!(tree.parent(mark), None);
    }

    #[test]
    fn test_merge_rejects_mismatched_siblings() {
        let mut tree = ContentTree::parse_xhtml("<p>a<i>b</i></p>").unwrap();
        let root = tree.root();
        let italic = tree.child(root, 1).unwrap();
        assert!(matches!(
            tree.merge_into_previous(italic),
            Err(TreeError::Incompatible(_))
        ));
    }

    #[test]
    fn test_node_at_point_prefers_deepest() {
        let mut tree = ContentTree::parse_xhtml("<div><p>Hello <em>world</em></p></div>").unwrap();
        let root = tree.root();
        let p = tree.child(root, 0).unwrap();
        let em = tree.child(p, 1).unwrap();
        let world = tree.child(em, 0).unwrap();
        tree.set_layout(root, Rect::new(0.0, 0.0, 500.0, 500.0)).unwrap();
        tree.set_layout(p, Rect::new(0.0, 0.0, 500.0, 20.0)).unwrap();
        tree.set_layout(world, Rect::new(60.0, 0.0, 50.0, 20.0)).unwrap();

        assert_eq!(tree.node_at_point(70.0, 10.0), Some(world));
        assert_eq!(tree.node_at_point(10.0, 10.0), Some(p));
        assert_eq!(tree.node_at_point(10.0, 100.0), Some(root));
        assert_eq!(tree.node_at_point(900.0, 100.0), None);
    }

    #[test]
    fn test_scroll_into_view_centres_node() {
        let mut tree = ContentTree::new("div");
        let root = tree.root();
        let p = tree.append_element(root, "p").unwrap();
        let leaf = tree.append_text(p, "far down").unwrap();
        tree.set_viewport(Rect::new(0.0, 0.0, 800.0, 600.0));
        tree.set_layout(leaf, Rect::new(0.0, 2000.0, 100.0, 40.0)).unwrap();

        tree.scroll_into_view(p);
        assert_eq!(tree.scroll_top(), 1720.0);

        // Hit testing uses viewport coordinates
        assert_eq!(tree.node_at_point(10.0, 300.0), Some(leaf));
    }

    #[test]
    fn test_selection_round_trip() {
        let mut tree = ContentTree::new("p");
        let root = tree.root();
        let leaf = tree.append_text(root, "selected").unwrap();
        tree.select(Some(LiveRange::new(leaf, 0, leaf, 4)));
        assert!(tree.current_selection().is_some());
        tree.clear_selection();
        assert!(tree.current_selection().is_none());
    }
}
