use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::Node;

#[derive(Debug, Clone)]
struct PathEntry {
    node: Node,
    /// Index of the child the position points into
    index: usize,
    /// Absolute position where that child starts
    offset: usize,
}

/// A position together with the chain of ancestors that contain it
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> ModelResult<Self> {
        if pos > doc.content_size() {
            return Err(ModelError::out_of_range(pos, doc.content_size()));
        }

        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node
                .content()
                .find_index(parent_offset)
                .ok_or_else(|| ModelError::out_of_range(pos, doc.content_size()))?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = match node.child(index) {
                Some(child) => child.clone(),
                None => break,
            };
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }

        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors between the root and the innermost parent
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// The innermost node that contains the position
    pub fn parent(&self) -> &Node {
        &self.path[self.depth()].node
    }

    /// Ancestor at the given depth (0 is the root)
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Start of the content of the ancestor at `depth`
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    /// End of the content of the ancestor at `depth`
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Offset into the text node the position points into, 0 between nodes
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut_text(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return parent.child(index).map(|child| child.cut_text(0, offset));
        }
        index.checked_sub(1).and_then(|i| parent.child(i)).cloned()
    }

    /// Marks that content inserted here would carry. Non-inclusive marks
    /// only continue when the node on the other side carries them too.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());

        if parent.content_size() == 0 {
            return Vec::new();
        }

        if self.text_offset() > 0 {
            return parent
                .child(index)
                .map(|child| child.marks().to_vec())
                .unwrap_or_default();
        }

        let before = index.checked_sub(1).and_then(|i| parent.child(i));
        let after = parent.child(index);
        let (main, other) = match before {
            Some(before) => (Some(before), after),
            None => (after, None),
        };
        let main = match main {
            Some(main) => main,
            None => return Vec::new(),
        };

        main.marks()
            .iter()
            .filter(|mark| {
                mark.is_inclusive()
                    || other
                        .map(|other| mark.is_in_set(other.marks()))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attrs, Schema};
    use serde_json::json;

    fn doc_with_marks(schema: &Schema) -> Node {
        let strong = schema.mark("strong", &Attrs::new()).unwrap();
        let mut href = Attrs::new();
        href.insert("href".to_string(), json!("https://example.com"));
        let link = schema.mark("link", &href).unwrap();
        let paragraph = schema
            .node(
                "paragraph",
                &Attrs::new(),
                vec![
                    schema.text("ab", vec![strong.clone()]).unwrap(),
                    schema.text("cd", vec![strong, link]).unwrap(),
                    schema.text("ef", vec![]).unwrap(),
                ],
                vec![],
            )
            .unwrap();
        schema.node("doc", &Attrs::new(), vec![paragraph], vec![]).unwrap()
    }

    #[test]
    fn test_resolve_depth_and_offsets() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        let pos = doc.resolve(2).unwrap();
        assert_eq!(pos.depth(), 1);
        assert_eq!(pos.parent().type_name(), "paragraph");
        assert_eq!(pos.parent_offset(), 1);
        assert_eq!(pos.text_offset(), 1);
        assert_eq!(pos.start(1), 1);
        assert_eq!(pos.end(1), 7);
    }

    #[test]
    fn test_out_of_range() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        assert!(doc.resolve(9).is_err());
    }

    #[test]
    fn test_marks_inside_text() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        let marks = doc.resolve(4).unwrap().marks();
        assert_eq!(marks.len(), 2);
    }

    #[test]
    fn test_non_inclusive_mark_dropped_at_end() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        // between "cd" (strong+link) and "ef" (none)
        let marks = doc.resolve(5).unwrap().marks();
        let names: Vec<&str> = marks.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["strong"]);
    }

    #[test]
    fn test_marks_at_parent_start_use_following_node() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        let marks = doc.resolve(1).unwrap().marks();
        let names: Vec<&str> = marks.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["strong"]);
    }

    #[test]
    fn test_node_before_and_after() {
        let schema = Schema::basic_builder().build().unwrap();
        let doc = doc_with_marks(&schema);
        let pos = doc.resolve(2).unwrap();
        assert_eq!(pos.node_before().unwrap().text(), Some("a"));
        assert_eq!(pos.node_after().unwrap().text(), Some("b"));
    }
}
