use std::fmt;

use serde_json::Value;

use crate::schema::{Attrs, MarkType};

/// A mark (emphasis, link, ...) attached to an inline node
#[derive(Clone)]
pub struct Mark {
    mark_type: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(mark_type: MarkType, attrs: Attrs) -> Self {
        Self { mark_type, attrs }
    }

    pub fn mark_type(&self) -> &MarkType {
        &self.mark_type
    }

    pub fn name(&self) -> &str {
        self.mark_type.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn is_inclusive(&self) -> bool {
        self.mark_type.is_inclusive()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|mark| mark == self)
    }

    /// Add this mark to a set, replacing any mark of the same type
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut marks: Vec<Mark> = set
            .iter()
            .filter(|mark| mark.mark_type != self.mark_type)
            .cloned()
            .collect();
        marks.push(self.clone());
        marks
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|mark| *mark != self).cloned().collect()
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.mark_type == other.mark_type && self.attrs == other.attrs
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}{:?}", self.name(), self.attrs)
        }
    }
}

/// Order-insensitive comparison of two mark sets
pub fn same_mark_set(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().all(|mark| mark.is_in_set(b))
}
