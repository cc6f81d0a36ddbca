//! # Transactions and Editor State
//!
//! ## Lifecycle
//!
//! ```text
//! EditorState ──tr()──→ Transaction ──steps──→ Transaction ──apply()──→ EditorState
//!   (doc v1)            (before = v1)          (doc = v1')              (doc v2)
//! ```
//!
//! A transaction records every step it applied, the intermediate documents
//! and the composed position mapping. Nothing is shared with the state until
//! [`EditorState::apply`] accepts it; dropping a transaction discards it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::node::{Fragment, Node};
use crate::schema::{Attrs, Schema};
use crate::step::{Mapping, Step};

/// Metadata key that keeps a transaction out of undo history
pub const ADD_TO_HISTORY: &str = "addToHistory";

/// An ordered batch of steps over one base document
#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
    meta: BTreeMap<String, Value>,
}

impl Transaction {
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            schema,
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Document the transaction started from
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// Document after every step so far
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Documents before each step, in step order
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    /// Mapping from positions in [`Transaction::before`] to positions in
    /// [`Transaction::doc`]
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step. On failure the transaction is left unchanged.
    pub fn step(&mut self, step: Step) -> ModelResult<&mut Self> {
        let doc = step.apply(&self.doc)?;
        self.mapping.append_map(step.get_map());
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: impl Into<Fragment>,
    ) -> ModelResult<&mut Self> {
        self.step(Step::Replace {
            from,
            to,
            content: content.into(),
        })
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> ModelResult<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> ModelResult<&mut Self> {
        self.replace_with(from, to, Fragment::empty())
    }

    /// Replace the attributes of the node at `pos`. Type, marks and content
    /// are kept.
    pub fn set_node_markup(&mut self, pos: usize, attrs: Attrs) -> ModelResult<&mut Self> {
        self.step(Step::SetNodeMarkup { pos, attrs })
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// False when tagged with `addToHistory = false`
    pub fn add_to_history(&self) -> bool {
        !matches!(self.meta.get(ADD_TO_HISTORY), Some(Value::Bool(false)))
    }
}

/// Current document plus the schema it conforms to
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,

    /// Incremented on each applied transaction
    pub version: u64,
}

impl EditorState {
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            schema,
            doc,
            version: 0,
        }
    }

    /// State holding an empty document: a single empty paragraph when the
    /// schema has one, otherwise an empty top node
    pub fn empty(schema: Arc<Schema>) -> ModelResult<Self> {
        let content = if schema.has_node_type("paragraph") {
            vec![schema.node("paragraph", &Attrs::new(), vec![], vec![])?]
        } else {
            vec![]
        };
        let top = schema.top_node_type()?.name().to_string();
        let doc = schema.node(&top, &Attrs::new(), content, vec![])?;
        Ok(Self::new(schema, doc))
    }

    pub fn from_json(schema: Arc<Schema>, value: &Value) -> ModelResult<Self> {
        let doc = Node::from_json(&schema, value)?;
        Ok(Self::new(schema, doc))
    }

    pub fn to_json(&self) -> Value {
        self.doc.to_json()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Start a transaction on the current document
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.schema.clone(), self.doc.clone())
    }

    /// Produce the next state. The transaction must start from this state's
    /// document.
    pub fn apply(&self, tr: &Transaction) -> ModelResult<EditorState> {
        if !tr.before().ptr_eq(&self.doc) {
            return Err(ModelError::MismatchedTransaction);
        }
        debug!(
            version = self.version + 1,
            steps = tr.steps().len(),
            add_to_history = tr.add_to_history(),
            "Applying transaction"
        );
        Ok(EditorState {
            schema: self.schema.clone(),
            doc: tr.doc().clone(),
            version: self.version + 1,
        })
    }
}
