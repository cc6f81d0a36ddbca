//! # Field Locator
//!
//! Pure queries over a document snapshot. Results pair each field with its
//! position in that snapshot and are only valid against it; carry positions
//! into later versions through a transaction mapping.

use fieldmark_model::Node;
use serde_json::Value;

use crate::errors::{CommandError, CommandResult};
use crate::schema::{FieldAttrs, FIELD_TYPE_NAME};

/// A field node and its position in one document version
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedField {
    pub node: Node,
    pub pos: usize,
}

impl LocatedField {
    pub fn new(node: Node, pos: usize) -> Self {
        Self { node, pos }
    }

    pub fn attrs(&self) -> FieldAttrs<'_> {
        FieldAttrs::of(&self.node)
    }

    /// Position just after the node
    pub fn end(&self) -> usize {
        self.pos + self.node.node_size()
    }
}

/// One id or name, or a collection of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    One(String),
    Many(Vec<String>),
}

impl Identity {
    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            Identity::One(value) => value == candidate,
            Identity::Many(values) => values.iter().any(|value| value == candidate),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Identity::Many(values) if values.is_empty())
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity::One(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Identity::One(value)
    }
}

impl From<&String> for Identity {
    fn from(value: &String) -> Self {
        Identity::One(value.clone())
    }
}

impl<S: Into<String>> From<Vec<S>> for Identity {
    fn from(values: Vec<S>) -> Self {
        Identity::Many(values.into_iter().map(Into::into).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for Identity {
    fn from(values: &[S]) -> Self {
        Identity::Many(values.iter().map(|v| v.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Identity {
    fn from(values: [S; N]) -> Self {
        Identity::Many(values.iter().map(|v| v.as_ref().to_string()).collect())
    }
}

pub fn is_field(node: &Node) -> bool {
    node.type_name() == FIELD_TYPE_NAME
}

/// Every field in document order
pub fn all_fields(doc: &Node) -> Vec<LocatedField> {
    fields_where(doc, |_| true)
}

/// Fields for which `predicate` holds, in document order
pub fn fields_where<P>(doc: &Node, predicate: P) -> Vec<LocatedField>
where
    P: Fn(&Node) -> bool,
{
    let mut fields = Vec::new();
    doc.descendants(&mut |node: &Node, pos, _parent: &Node, _index| {
        if is_field(node) && predicate(node) {
            fields.push(LocatedField::new(node.clone(), pos));
        }
        true
    });
    fields
}

/// Fields whose `id` is in `ids`. A field with a null id never matches.
pub fn fields_by_id(doc: &Node, ids: impl Into<Identity>) -> Vec<LocatedField> {
    fields_by_attr(doc, "id", ids.into())
}

/// Fields whose `name` is in `names`
pub fn fields_by_name(doc: &Node, names: impl Into<Identity>) -> Vec<LocatedField> {
    fields_by_attr(doc, "name", names.into())
}

fn fields_by_attr(doc: &Node, key: &str, identity: Identity) -> Vec<LocatedField> {
    if identity.is_empty() {
        return Vec::new();
    }
    fields_where(doc, |node| match node.attr(key) {
        Some(Value::String(value)) => identity.contains(value),
        _ => false,
    })
}

/// The field starting at `pos`
pub fn field_at(doc: &Node, pos: usize) -> CommandResult<LocatedField> {
    match doc.node_at(pos) {
        Some(node) if is_field(&node) => Ok(LocatedField::new(node, pos)),
        Some(node) => Err(CommandError::NotAField {
            pos,
            found: node.type_name().to_string(),
        }),
        None => Err(CommandError::NotAField {
            pos,
            found: "nothing".to_string(),
        }),
    }
}

/// Fields overlapping `from..to`. Bounds are clamped to the document.
pub fn fields_in_range(doc: &Node, from: usize, to: usize) -> Vec<LocatedField> {
    let to = to.min(doc.content_size());
    if from >= to {
        return Vec::new();
    }
    let mut fields = Vec::new();
    doc.nodes_between(from, to, &mut |node: &Node, pos, _parent: &Node, _index| {
        if node.node_size() == 0 {
            return false;
        }
        if is_field(node) {
            fields.push(LocatedField::new(node.clone(), pos));
        }
        true
    });
    fields
}
