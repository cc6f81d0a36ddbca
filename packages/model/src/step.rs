//! # Steps and Position Mapping
//!
//! A [`Step`] is one structural edit. Applying it yields a new document and
//! a [`StepMap`] that translates positions in the old document into the new
//! one. A [`Mapping`] chains step maps so that a position taken from the
//! base document of a transaction can be carried through every edit made so
//! far.

use crate::error::ModelResult;
use crate::node::{Fragment, Node};
use crate::schema::Attrs;

/// Which side of an insertion a position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    Before,
    #[default]
    After,
}

/// One structural edit
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with closed content
    Replace {
        from: usize,
        to: usize,
        content: Fragment,
    },

    /// Replace the attributes of the node at `pos`
    SetNodeMarkup { pos: usize, attrs: Attrs },
}

impl Step {
    pub fn apply(&self, doc: &Node) -> ModelResult<Node> {
        match self {
            Step::Replace { from, to, content } => doc.replace(*from, *to, content),
            Step::SetNodeMarkup { pos, attrs } => doc.set_markup(*pos, attrs),
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => {
                StepMap::new(*from, to.saturating_sub(*from), content.size())
            }
            // attribute changes keep node sizes
            Step::SetNodeMarkup { .. } => StepMap::empty(),
        }
    }
}

/// Result of mapping a single position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position was strictly inside a replaced range
    pub deleted: bool,
}

/// Position translation for one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    /// `(start, old_size, new_size)` triples in ascending order
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::empty();
        }
        Self {
            ranges: vec![(start, old_size, new_size)],
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let moved = match side {
                    Assoc::Before => 0,
                    Assoc::After => new_size as isize,
                };
                return MapResult {
                    pos: (start as isize + diff + moved) as usize,
                    deleted: pos > start && pos < end,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }
}

/// Chain of step maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// Map a position through every step, sticking after insertions
    pub fn map(&self, pos: usize) -> usize {
        self.map_with(pos, Assoc::After)
    }

    pub fn map_with(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_map() {
        // delete 3..5
        let map = StepMap::new(3, 2, 0);
        assert_eq!(map.map(1, Assoc::After), 1);
        assert_eq!(map.map(3, Assoc::After), 3);
        assert_eq!(map.map(4, Assoc::After), 3);
        assert_eq!(map.map(5, Assoc::After), 3);
        assert_eq!(map.map(9, Assoc::After), 7);
        assert!(map.map_result(4, Assoc::After).deleted);
    }

    #[test]
    fn test_insertion_assoc() {
        // insert 2 at 4
        let map = StepMap::new(4, 0, 2);
        assert_eq!(map.map(4, Assoc::After), 6);
        assert_eq!(map.map(4, Assoc::Before), 4);
        assert_eq!(map.map(3, Assoc::After), 3);
        assert_eq!(map.map(5, Assoc::After), 7);
    }

    #[test]
    fn test_replacement_ends() {
        // replace 2..3 with 4 units
        let map = StepMap::new(2, 1, 4);
        assert_eq!(map.map(2, Assoc::After), 2);
        assert_eq!(map.map(3, Assoc::After), 6);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(1, 1, 0));
        mapping.append_map(StepMap::new(2, 1, 0));
        // original positions 1, 3, 5 with fields of size 1 at each
        assert_eq!(mapping.map(1), 1);
        assert_eq!(mapping.map(5), 3);
    }

    #[test]
    fn test_empty_map_is_identity() {
        let map = StepMap::empty();
        assert_eq!(map.map(12, Assoc::Before), 12);
    }
}
