//! # Editor Host
//!
//! What node views and plugins need from the editor that embeds them, plus
//! [`MemoryHost`], an in-process implementation for headless use.
//!
//! ```text
//! FieldView / plugins ──state()──→ EditorHost ──dispatch(tr)──→ next EditorState
//!                     ←─track()──  (positions remapped on every dispatch)
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fieldmark_model::{Assoc, EditorState, Node, Transaction};
use tracing::{debug, info};

use crate::errors::ViewResult;
use crate::events::{Coords, PosAccessor};

/// The editor a node view or plugin lives in
pub trait EditorHost {
    /// Current state
    fn state(&self) -> EditorState;

    /// Apply a transaction built against the current state
    fn dispatch(&self, tr: Transaction) -> ViewResult<()>;

    /// Whether the user may edit
    fn editable(&self) -> bool;

    /// Document position under viewport coordinates
    fn pos_at_coords(&self, coords: Coords) -> Option<usize>;

    /// Live accessor for the node of `size` at `pos`. It reports `None` once
    /// the node has been removed or replaced.
    fn track(&self, pos: usize, size: usize) -> PosAccessor;
}

type CoordsFn = Box<dyn Fn(Coords, &Node) -> Option<usize>>;

struct TrackedPos {
    pos: Cell<Option<usize>>,
    size: usize,
}

impl TrackedPos {
    fn remap(&self, tr: &Transaction) {
        let Some(pos) = self.pos.get() else {
            return;
        };
        let start = tr.mapping().map_with(pos, Assoc::After);
        let end = tr.mapping().map_with(pos + self.size, Assoc::Before);
        let next = (end >= start && end - start == self.size).then_some(start);
        if next.is_none() {
            debug!(pos, "Tracked node removed");
        }
        self.pos.set(next);
    }
}

/// In-process host holding the state in memory
pub struct MemoryHost {
    state: RefCell<EditorState>,
    editable: Cell<bool>,
    coords: CoordsFn,
    tracked: RefCell<Vec<Weak<TrackedPos>>>,
    dispatched: Cell<usize>,
    undoable: Cell<usize>,
}

impl MemoryHost {
    /// Host over `state`. Coordinates resolve by reading `left` as a document
    /// position until a resolver is supplied.
    pub fn new(state: EditorState) -> Self {
        Self {
            state: RefCell::new(state),
            editable: Cell::new(true),
            coords: Box::new(|coords, doc| {
                let pos = coords.left;
                (pos >= 0.0 && pos <= doc.content_size() as f64).then(|| pos as usize)
            }),
            tracked: RefCell::new(Vec::new()),
            dispatched: Cell::new(0),
            undoable: Cell::new(0),
        }
    }

    pub fn with_coords_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(Coords, &Node) -> Option<usize> + 'static,
    {
        self.coords = Box::new(f);
        self
    }

    pub fn set_editable(&self, editable: bool) {
        self.editable.set(editable);
    }

    /// Transactions applied so far
    pub fn dispatched(&self) -> usize {
        self.dispatched.get()
    }

    /// Applied transactions that are recorded for undo
    pub fn undoable(&self) -> usize {
        self.undoable.get()
    }

    /// Current document
    pub fn doc(&self) -> Node {
        self.state.borrow().doc().clone()
    }
}

impl EditorHost for MemoryHost {
    fn state(&self) -> EditorState {
        self.state.borrow().clone()
    }

    fn dispatch(&self, tr: Transaction) -> ViewResult<()> {
        let next = self.state.borrow().apply(&tr)?;

        self.tracked.borrow_mut().retain(|tracked| match tracked.upgrade() {
            Some(tracked) => {
                tracked.remap(&tr);
                true
            }
            None => false,
        });

        info!(
            version = next.version,
            steps = tr.steps().len(),
            add_to_history = tr.add_to_history(),
            "Transaction applied"
        );
        *self.state.borrow_mut() = next;
        self.dispatched.set(self.dispatched.get() + 1);
        if tr.add_to_history() {
            self.undoable.set(self.undoable.get() + 1);
        }
        Ok(())
    }

    fn editable(&self) -> bool {
        self.editable.get()
    }

    fn pos_at_coords(&self, coords: Coords) -> Option<usize> {
        let state = self.state.borrow();
        (self.coords)(coords, state.doc())
    }

    fn track(&self, pos: usize, size: usize) -> PosAccessor {
        let tracked = Rc::new(TrackedPos {
            pos: Cell::new(Some(pos)),
            size,
        });
        self.tracked.borrow_mut().push(Rc::downgrade(&tracked));
        PosAccessor::new(move || tracked.pos.get())
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("version", &self.state.borrow().version)
            .field("editable", &self.editable.get())
            .field("dispatched", &self.dispatched.get())
            .finish()
    }
}
