//! # Nodes and Fragments
//!
//! Immutable document tree.
//!
//! A [`Node`] is a cheap handle to shared, never-mutated node data. Editing a
//! tree copies the path from the root to the edited parent and reuses every
//! other subtree, so older versions stay valid for as long as someone holds
//! them.
//!
//! ## Positions
//!
//! ```text
//! doc( paragraph( "A" field "B" ) )
//!     0          1   2     3   4   5
//! ```
//!
//! Positions count from the start of the root's content. Entering or leaving
//! a non-leaf node counts one, each character counts one, a leaf counts one.

use std::cmp::min;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::mark::{same_mark_set, Mark};
use crate::resolved::ResolvedPos;
use crate::schema::{Attrs, NodeType};

struct NodeData {
    node_type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    size: usize,
}

/// Handle to an immutable document node
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub(crate) fn new(
        node_type: NodeType,
        attrs: Attrs,
        content: Fragment,
        marks: Vec<Mark>,
        text: Option<String>,
    ) -> Self {
        let size = match &text {
            Some(text) => text.chars().count(),
            None if node_type.is_leaf() => 1,
            None => content.size() + 2,
        };
        Node(Arc::new(NodeData {
            node_type,
            attrs,
            content,
            marks,
            text,
            size,
        }))
    }

    pub fn node_type(&self) -> &NodeType {
        &self.0.node_type
    }

    pub fn type_name(&self) -> &str {
        self.0.node_type.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.0.node_type.is_inline()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.node_type.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.node_type.is_atom()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.node_type.is_textblock()
    }

    /// Size of this node in the position model
    pub fn node_size(&self) -> usize {
        self.0.size
    }

    pub fn content_size(&self) -> usize {
        self.0.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.0.content.child(index)
    }

    pub fn children(&self) -> std::slice::Iter<'_, Node> {
        self.0.content.iter()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        match &self.0.text {
            Some(text) => text.clone(),
            None => self.0.content.iter().map(Node::text_content).collect(),
        }
    }

    /// Same handle, no structural comparison
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same type, attributes and marks
    pub fn same_markup(&self, other: &Node) -> bool {
        self.0.node_type == other.0.node_type
            && self.0.attrs == other.0.attrs
            && same_mark_set(&self.0.marks, &other.0.marks)
    }

    pub(crate) fn with_attrs(&self, attrs: Attrs) -> Node {
        Node::new(
            self.0.node_type.clone(),
            attrs,
            self.0.content.clone(),
            self.0.marks.clone(),
            self.0.text.clone(),
        )
    }

    pub(crate) fn with_content(&self, content: Fragment) -> Node {
        Node::new(
            self.0.node_type.clone(),
            self.0.attrs.clone(),
            content,
            self.0.marks.clone(),
            None,
        )
    }

    fn with_text(&self, text: String) -> Node {
        Node::new(
            self.0.node_type.clone(),
            Attrs::new(),
            Fragment::empty(),
            self.0.marks.clone(),
            Some(text),
        )
    }

    /// Copy of this node carrying a different mark set
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        Node::new(
            self.0.node_type.clone(),
            self.0.attrs.clone(),
            self.0.content.clone(),
            marks,
            self.0.text.clone(),
        )
    }

    /// Slice of a text node by character offsets
    pub(crate) fn cut_text(&self, from: usize, to: usize) -> Node {
        match &self.0.text {
            Some(text) => self.with_text(text.chars().skip(from).take(to - from).collect()),
            None => self.clone(),
        }
    }

    /// The node that starts at `pos`, or the text node containing it
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos)?;
            let child = node.content().child(index)?;
            if offset == pos || child.is_text() {
                return Some(child.clone());
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Visit every node overlapping `from..to`. The callback receives the
    /// node, its absolute position, its parent and its index in the parent.
    /// Returning `false` skips the node's children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.0.content.nodes_between(from, to, f, 0, self);
    }

    /// Visit every descendant in document order
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// Replace `from..to` with `content`. Both ends must share a parent and
    /// the result must satisfy the parent's content rule.
    pub fn replace(&self, from: usize, to: usize, content: &Fragment) -> ModelResult<Node> {
        if from > to {
            return Err(ModelError::UnsupportedReplace { from, to });
        }
        let rf = self.resolve(from)?;
        let rt = self.resolve(to)?;
        if !rf.same_parent(&rt) {
            return Err(ModelError::UnsupportedReplace { from, to });
        }

        let parent = rf.parent();
        let before = parent.content().cut(0, rf.parent_offset());
        let after = parent.content().cut(rt.parent_offset(), parent.content_size());
        let new_content = before.append(content).append(&after);
        parent.node_type().check_content(&new_content)?;

        let mut node = parent.with_content(new_content);
        for depth in (0..rf.depth()).rev() {
            let ancestor = rf.node(depth);
            node = ancestor.with_content(ancestor.content().replace_child(rf.index(depth), node));
        }
        Ok(node)
    }

    /// Replace the attributes of the node starting at `pos`
    pub fn set_markup(&self, pos: usize, attrs: &Attrs) -> ModelResult<Node> {
        let target = self.node_at(pos).ok_or(ModelError::NoNodeAt { pos })?;
        if target.is_text() {
            return Err(ModelError::invalid_content(
                "text",
                "text nodes have no attributes to update",
            ));
        }
        let attrs = target.node_type().compute_attrs(attrs)?;
        let updated = target.with_attrs(attrs);
        self.replace(pos, pos + target.node_size(), &Fragment::from(updated))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.same_markup(other)
                && self.0.text == other.0.text
                && self.0.content == other.0.content)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.0.text {
            if self.0.marks.is_empty() {
                return write!(f, "{:?}", text);
            }
            return write!(f, "{:?}{:?}", self.0.marks, text);
        }
        write!(f, "{}", self.type_name())?;
        if !self.0.attrs.is_empty() {
            write!(f, "{:?}", self.0.attrs)?;
        }
        if !self.0.content.is_empty() {
            f.debug_list().entries(self.0.content.iter()).finish()?;
        }
        Ok(())
    }
}

/// Ordered children of a node
#[derive(Clone, Default)]
pub struct Fragment {
    children: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment, joining adjacent text nodes with equal marks
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut children: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            push_joined(&mut children, node);
        }
        let size = children.iter().map(Node::node_size).sum();
        Self { children, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.children.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Index of the child at `pos` and the offset where it starts.
    /// A position between two children points at the later one.
    pub fn find_index(&self, pos: usize) -> Option<(usize, usize)> {
        if pos == 0 {
            return Some((0, 0));
        }
        if pos == self.size {
            return Some((self.children.len(), pos));
        }
        if pos > self.size {
            return None;
        }
        let mut cur = 0;
        for (index, child) in self.children.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Some((index + 1, end));
                }
                return Some((index, cur));
            }
            cur = end;
        }
        None
    }

    /// Content between two offsets. Offsets fall on child boundaries or
    /// inside text nodes, which are split.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut pos = 0;
        for child in &self.children {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                let piece = if child.is_text() {
                    let start = from.saturating_sub(pos);
                    let stop = min(child.node_size(), to - pos);
                    if start > 0 || stop < child.node_size() {
                        child.cut_text(start, stop)
                    } else {
                        child.clone()
                    }
                } else {
                    child.clone()
                };
                result.push(piece);
            }
            pos = end;
        }
        Fragment::from_nodes(result)
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut children = self.children.clone();
        for node in &other.children {
            push_joined(&mut children, node.clone());
        }
        let size = children.iter().map(Node::node_size).sum();
        Fragment { children, size }
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut children = self.children.clone();
        if index < children.len() {
            children[index] = node;
        }
        Fragment::from_nodes(children)
    }

    pub(crate) fn nodes_between<F>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: &Node,
    ) where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        let mut pos = 0;
        for (index, child) in self.children.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, index) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    min(child.content_size(), to.saturating_sub(start)),
                    f,
                    node_start + start,
                    child,
                );
            }
            pos = end;
        }
    }
}

fn push_joined(children: &mut Vec<Node>, node: Node) {
    let joined = match (children.last(), node.text()) {
        (Some(last), Some(text)) => match last.text() {
            Some(last_text) if same_mark_set(last.marks(), node.marks()) => {
                Some(last.with_text(format!("{}{}", last_text, text)))
            }
            _ => None,
        },
        _ => None,
    };
    match joined {
        Some(joined) => {
            if let Some(last) = children.last_mut() {
                *last = joined;
            }
        }
        None => {
            if node.text().map(str::is_empty).unwrap_or(false) {
                return;
            }
            children.push(node);
        }
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_nodes(vec![node])
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.children == other.children
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.children.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::basic_builder().build().unwrap()
    }

    fn image(schema: &Schema, src: &str) -> Node {
        let mut attrs = Attrs::new();
        attrs.insert("src".to_string(), json!(src));
        schema.node("image", &attrs, vec![], vec![]).unwrap()
    }

    fn sample(schema: &Schema) -> Node {
        let paragraph = schema
            .node(
                "paragraph",
                &Attrs::new(),
                vec![
                    schema.text("A", vec![]).unwrap(),
                    image(schema, "x.png"),
                    schema.text("B", vec![]).unwrap(),
                ],
                vec![],
            )
            .unwrap();
        schema.node("doc", &Attrs::new(), vec![paragraph], vec![]).unwrap()
    }

    #[test]
    fn test_sizes() {
        let schema = schema();
        let doc = sample(&schema);
        assert_eq!(doc.content_size(), 5);
        assert_eq!(doc.child(0).unwrap().node_size(), 5);
    }

    #[test]
    fn test_node_at() {
        let schema = schema();
        let doc = sample(&schema);
        assert_eq!(doc.node_at(0).unwrap().type_name(), "paragraph");
        assert_eq!(doc.node_at(1).unwrap().text(), Some("A"));
        assert_eq!(doc.node_at(2).unwrap().type_name(), "image");
        assert_eq!(doc.node_at(3).unwrap().text(), Some("B"));
        assert!(doc.node_at(5).is_none());
    }

    #[test]
    fn test_adjacent_text_joins() {
        let schema = schema();
        let fragment = Fragment::from_nodes(vec![
            schema.text("ab", vec![]).unwrap(),
            schema.text("cd", vec![]).unwrap(),
        ]);
        assert_eq!(fragment.child_count(), 1);
        assert_eq!(fragment.size(), 4);
    }

    #[test]
    fn test_text_with_different_marks_stays_split() {
        let schema = schema();
        let strong = schema.mark("strong", &Attrs::new()).unwrap();
        let fragment = Fragment::from_nodes(vec![
            schema.text("ab", vec![strong]).unwrap(),
            schema.text("cd", vec![]).unwrap(),
        ]);
        assert_eq!(fragment.child_count(), 2);
    }

    #[test]
    fn test_replace_shares_untouched_subtrees() {
        let schema = schema();
        let first = schema
            .node("paragraph", &Attrs::new(), vec![schema.text("one", vec![]).unwrap()], vec![])
            .unwrap();
        let second = schema
            .node("paragraph", &Attrs::new(), vec![schema.text("two", vec![]).unwrap()], vec![])
            .unwrap();
        let doc = schema
            .node("doc", &Attrs::new(), vec![first.clone(), second], vec![])
            .unwrap();

        // delete "w" from "two"
        let edited = doc.replace(7, 8, &Fragment::empty()).unwrap();
        assert!(edited.child(0).unwrap().ptr_eq(&first));
        assert_eq!(edited.child(1).unwrap().text_content(), "to");
        assert_eq!(doc.child(1).unwrap().text_content(), "two");
    }

    #[test]
    fn test_replace_inside_text_splits_it() {
        let schema = schema();
        let doc = schema
            .node(
                "doc",
                &Attrs::new(),
                vec![schema
                    .node("paragraph", &Attrs::new(), vec![schema.text("abcd", vec![]).unwrap()], vec![])
                    .unwrap()],
                vec![],
            )
            .unwrap();
        let edited = doc
            .replace(3, 3, &Fragment::from(image(&schema, "i.png")))
            .unwrap();
        let paragraph = edited.child(0).unwrap();
        assert_eq!(paragraph.child_count(), 3);
        assert_eq!(paragraph.child(0).unwrap().text(), Some("ab"));
        assert_eq!(paragraph.child(1).unwrap().type_name(), "image");
        assert_eq!(paragraph.child(2).unwrap().text(), Some("cd"));
    }

    #[test]
    fn test_replace_across_parents_rejected() {
        let schema = schema();
        let p = || {
            schema
                .node("paragraph", &Attrs::new(), vec![schema.text("ab", vec![]).unwrap()], vec![])
                .unwrap()
        };
        let doc = schema.node("doc", &Attrs::new(), vec![p(), p()], vec![]).unwrap();
        let err = doc.replace(2, 6, &Fragment::empty()).unwrap_err();
        assert_eq!(err, ModelError::UnsupportedReplace { from: 2, to: 6 });
    }

    #[test]
    fn test_inline_into_block_content_rejected() {
        let schema = schema();
        let doc = sample(&schema);
        let err = doc
            .replace(0, 0, &Fragment::from(image(&schema, "i.png")))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidContent { .. }));
    }

    #[test]
    fn test_set_markup() {
        let schema = schema();
        let doc = sample(&schema);
        let mut attrs = Attrs::new();
        attrs.insert("src".to_string(), json!("y.png"));
        let edited = doc.set_markup(2, &attrs).unwrap();
        assert_eq!(edited.node_at(2).unwrap().attr("src"), Some(&json!("y.png")));
        assert_eq!(edited.content_size(), doc.content_size());
    }

    #[test]
    fn test_descendants_reports_positions() {
        let schema = schema();
        let doc = sample(&schema);
        let mut seen = Vec::new();
        doc.descendants(&mut |node, pos, _, _| {
            seen.push((node.type_name().to_string(), pos));
            true
        });
        assert_eq!(
            seen,
            vec![
                ("paragraph".to_string(), 0),
                ("text".to_string(), 1),
                ("image".to_string(), 2),
                ("text".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_structural_equality() {
        let schema = schema();
        assert_eq!(sample(&schema), sample(&schema));
        assert_ne!(image(&schema, "a"), image(&schema, "b"));
    }
}
