//! # Field Node View
//!
//! Owns the presentation of one field node for as long as the host keeps it
//! on screen.
//!
//! ```text
//! Unmounted ──build()──→ Built ──update()──→ Updated ──update()──→ Updated
//!                          └──────────┴──destroy()──→ Destroyed
//! ```
//!
//! The view never caches its position: it asks the host-provided accessor,
//! which reports `None` once the node is gone.

use std::fmt;
use std::rc::Rc;

use fieldmark_editor::{
    all_fields, field_at, update_field_attrs, Command, FieldAttrs, FieldSchema,
    FIELD_CONTENT_CLASS,
};
use fieldmark_model::{Attrs, DomAttrs, DomNode, Node, Transaction};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::ViewResult;
use crate::events::{EventSink, FieldEvent, PosAccessor, RawEvent};
use crate::handlers::HandlerRegistry;
use crate::host::EditorHost;

/// Lifecycle of a [`FieldView`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Unmounted,
    Built,
    Updated,
    Destroyed,
}

/// Collaborators shared by every field view of one editor
#[derive(Clone)]
pub struct ViewContext {
    pub host: Rc<dyn EditorHost>,
    pub fields: Rc<FieldSchema>,
    pub handlers: Rc<HandlerRegistry>,
    pub sink: Rc<dyn EventSink>,
}

impl ViewContext {
    pub fn new(
        host: Rc<dyn EditorHost>,
        fields: FieldSchema,
        handlers: HandlerRegistry,
        sink: Rc<dyn EventSink>,
    ) -> Self {
        Self {
            host,
            fields: Rc::new(fields),
            handlers: Rc::new(handlers),
            sink,
        }
    }
}

impl fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field("fields", &self.fields)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

/// Wrapper style: light tint of the field color
pub fn field_style(node: &Node) -> String {
    let background = match FieldAttrs::of(node).color() {
        Some(color) => format!("{}33", color),
        None => "none".to_string(),
    };
    format!(
        "padding: 1px 2px; box-sizing: border-box; background-color: {}",
        background
    )
}

/// Presentation of one field node
pub struct FieldView {
    node: Node,
    get_pos: PosAccessor,
    ctx: ViewContext,
    root: Option<DomNode>,
    state: ViewState,
    listening: bool,
}

impl FieldView {
    pub fn new(node: Node, get_pos: PosAccessor, ctx: ViewContext) -> Self {
        Self {
            node,
            get_pos,
            ctx,
            root: None,
            state: ViewState::Unmounted,
            listening: false,
        }
    }

    /// Create and build in one step
    pub fn mount(node: Node, get_pos: PosAccessor, ctx: ViewContext) -> Self {
        let mut view = Self::new(node, get_pos, ctx);
        view.build();
        view
    }

    pub fn dom(&self) -> Option<&DomNode> {
        self.root.as_ref()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn pos(&self) -> Option<usize> {
        self.get_pos.get()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    fn wrapper_attrs(&self) -> DomAttrs {
        let mut attrs = self.ctx.fields.dom_attrs(&self.node);
        attrs.insert("style".to_string(), Value::from(field_style(&self.node)));
        attrs
    }

    /// Allocate the DOM and attach listeners
    #[instrument(skip(self), fields(kind = %FieldAttrs::of(&self.node).kind()))]
    pub fn build(&mut self) {
        if self.state != ViewState::Unmounted {
            warn!(state = ?self.state, "Field view already built");
            return;
        }

        let content = DomNode::element("span")
            .with_attr("class", FIELD_CONTENT_CLASS)
            .with_attr("contenteditable", "false")
            .with_style("pointer-events", "none");
        let mut root = DomNode::element("span").with_child(content);
        root.update_attributes(&self.wrapper_attrs(), &[]);

        let kind = FieldAttrs::of(&self.node).kind();
        self.ctx.handlers.handler_for(&kind).build(&self.node, &mut root);

        self.root = Some(root);
        self.listening = true;
        self.state = ViewState::Built;
        debug!("Field view built");
    }

    /// Take a new version of the node. Returns false when the view cannot
    /// represent it and the host must rebuild.
    pub fn update(&mut self, node: Node) -> bool {
        if node.node_type() != self.node.node_type() {
            return false;
        }
        if !matches!(self.state, ViewState::Built | ViewState::Updated) {
            debug!(state = ?self.state, "Update on inactive field view");
            return false;
        }

        self.node = node;
        let attrs = self.wrapper_attrs();
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        root.update_attributes(&attrs, &[]);

        let kind = FieldAttrs::of(&self.node).kind();
        self.ctx.handlers.handler_for(&kind).update(&self.node, root);
        self.state = ViewState::Updated;
        true
    }

    /// Detach listeners and release the DOM
    pub fn destroy(&mut self) {
        if self.state == ViewState::Destroyed {
            warn!("Field view destroyed twice");
            return;
        }
        self.listening = false;
        self.root = None;
        self.state = ViewState::Destroyed;
        debug!("Field view destroyed");
    }

    /// Merge `attrs` into the field through the host. Returns false when the
    /// node is no longer in the document; a live position that does not hold
    /// a field is an error.
    pub fn request_attribute_change(&self, attrs: Attrs) -> ViewResult<bool> {
        let Some(pos) = self.get_pos.get() else {
            debug!("Attribute change dropped, field no longer in document");
            return Ok(false);
        };

        let state = self.ctx.host.state();
        let current = field_at(state.doc(), pos)?;

        let mut pending = None;
        let command = update_field_attrs(vec![current], attrs);
        let handled = command.execute(&state, Some(&mut |tr: Transaction| pending = Some(tr)))?;
        if let Some(tr) = pending {
            self.ctx.host.dispatch(tr)?;
        }
        Ok(handled)
    }

    fn accepts_input(&self) -> bool {
        self.listening && self.ctx.host.editable()
    }

    /// Returns whether a notification was emitted
    pub fn handle_click(&self, event: RawEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.ctx.sink.emit(FieldEvent::Click {
            node: self.node.clone(),
            get_pos: self.get_pos.clone(),
            event,
        });
        true
    }

    /// Returns whether a notification was emitted
    pub fn handle_double_click(&self, event: RawEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.ctx.sink.emit(FieldEvent::DoubleClick {
            node: self.node.clone(),
            get_pos: self.get_pos.clone(),
            event,
        });
        true
    }

    /// Events inside the view are left to the host
    pub fn stop_event(&self, _event: &RawEvent) -> bool {
        false
    }

    /// The host never reads DOM mutations back from a field view
    pub fn ignore_mutation(&self) -> bool {
        true
    }
}

impl fmt::Debug for FieldView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldView")
            .field("pos", &self.pos())
            .field("state", &self.state)
            .field("listening", &self.listening)
            .finish()
    }
}

/// The field views of one editor, kept in step with the host document
#[derive(Debug)]
pub struct FieldViews {
    ctx: ViewContext,
    views: Vec<FieldView>,
}

impl FieldViews {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            views: Vec::new(),
        }
    }

    /// Reconcile views with the current document: update surviving views,
    /// destroy views whose node is gone, mount views for new fields
    pub fn sync(&mut self) {
        let state = self.ctx.host.state();
        let doc = state.doc();

        let mut kept = Vec::with_capacity(self.views.len());
        for mut view in self.views.drain(..) {
            let node = view.pos().and_then(|pos| doc.node_at(pos));
            match node {
                Some(node) => {
                    if view.update(node) {
                        kept.push(view);
                    } else {
                        view.destroy();
                    }
                }
                None => view.destroy(),
            }
        }

        for field in all_fields(doc) {
            if kept.iter().any(|view| view.pos() == Some(field.pos)) {
                continue;
            }
            let get_pos = self.ctx.host.track(field.pos, field.node.node_size());
            kept.push(FieldView::mount(field.node, get_pos, self.ctx.clone()));
        }

        kept.sort_by_key(|view| view.pos());
        self.views = kept;
        debug!(views = self.views.len(), "Field views synced");
    }

    pub fn views(&self) -> &[FieldView] {
        &self.views
    }

    pub fn view_at(&self, pos: usize) -> Option<&FieldView> {
        self.views.iter().find(|view| view.pos() == Some(pos))
    }

    pub fn view_at_mut(&mut self, pos: usize) -> Option<&mut FieldView> {
        self.views.iter_mut().find(|view| view.pos() == Some(pos))
    }

    pub fn destroy_all(&mut self) {
        for view in &mut self.views {
            view.destroy();
        }
        self.views.clear();
    }
}
