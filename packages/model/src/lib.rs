//! # Fieldmark Model
//!
//! Immutable, versioned rich-text document tree.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: node/mark types + attribute tables  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ node: Arc-shared tree, positions, resolve   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ step/transaction: edits + position mapping  │
//! │ EditorState: current doc + version          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every edit produces a new root. Positions taken from an older root are
//! carried forward through [`Transaction::mapping`].

mod dom;
mod error;
mod json;
mod mark;
mod node;
mod resolved;
mod schema;
mod step;
mod transaction;

pub use dom::{DomAttrs, DomNode, DEFAULT_BOOLEAN_ATTRIBUTES};
pub use error::{ModelError, ModelResult};
pub use mark::{same_mark_set, Mark};
pub use node::{Fragment, Node};
pub use resolved::ResolvedPos;
pub use schema::{
    AttrValidator, AttributeSpec, Attrs, ContentRule, MarkSpec, MarkType, NodeSpec, NodeType,
    Schema, SchemaBuilder, ValidateFn, ValueType,
};
pub use step::{Assoc, MapResult, Mapping, Step, StepMap};
pub use transaction::{EditorState, Transaction, ADD_TO_HISTORY};
