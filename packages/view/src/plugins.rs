//! # Interaction Plugins
//!
//! Drop and paste hooks. A [`PluginSet`] offers each input event to its
//! plugins in order and stops at the first one that handles it.

use std::fmt;
use std::rc::Rc;

use fieldmark_editor::{create_field, insert_field, is_field, Command, FIELD_PAYLOAD_KEY};
use fieldmark_model::{Attrs, Fragment, Transaction};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ViewResult;
use crate::events::{EventSink, FieldEvent, RawEvent};
use crate::host::EditorHost;

/// Input hooks of one editor plugin
pub trait EditorPlugin {
    fn key(&self) -> &str;

    /// Content dropped into the editor. `moved` is set when the drag
    /// started inside the same editor.
    fn handle_drop(
        &self,
        _host: &dyn EditorHost,
        _event: &RawEvent,
        _slice: &Fragment,
        _moved: bool,
    ) -> ViewResult<bool> {
        Ok(false)
    }

    fn handle_paste(
        &self,
        _host: &dyn EditorHost,
        _event: &RawEvent,
        _slice: &Fragment,
    ) -> ViewResult<bool> {
        Ok(false)
    }
}

/// Plugins in priority order
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn EditorPlugin>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, plugin: impl EditorPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn keys(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.key()).collect()
    }

    pub fn handle_drop(
        &self,
        host: &dyn EditorHost,
        event: &RawEvent,
        slice: &Fragment,
        moved: bool,
    ) -> ViewResult<bool> {
        for plugin in &self.plugins {
            if plugin.handle_drop(host, event, slice, moved)? {
                debug!(plugin = plugin.key(), "Drop handled");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn handle_paste(
        &self,
        host: &dyn EditorHost,
        event: &RawEvent,
        slice: &Fragment,
    ) -> ViewResult<bool> {
        for plugin in &self.plugins {
            if plugin.handle_paste(host, event, slice)? {
                debug!(plugin = plugin.key(), "Paste handled");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSet").field("plugins", &self.keys()).finish()
    }
}

/// Drag data carried under the field payload key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DropPayload {
    #[serde(default)]
    pub attrs: Attrs,
}

/// Turns a dropped field payload into a field at the drop point, or hands
/// it to the application when `handle_outside` is set
pub struct FieldDropPlugin {
    handle_outside: bool,
    sink: Rc<dyn EventSink>,
}

impl FieldDropPlugin {
    pub const KEY: &'static str = "placeholderFieldDrop";

    pub fn new(sink: Rc<dyn EventSink>) -> Self {
        Self {
            handle_outside: false,
            sink,
        }
    }

    pub fn handle_outside(mut self, handle_outside: bool) -> Self {
        self.handle_outside = handle_outside;
        self
    }
}

impl EditorPlugin for FieldDropPlugin {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn handle_drop(
        &self,
        host: &dyn EditorHost,
        event: &RawEvent,
        _slice: &Fragment,
        moved: bool,
    ) -> ViewResult<bool> {
        if moved || !host.editable() {
            return Ok(false);
        }
        let Some(raw) = event.data(FIELD_PAYLOAD_KEY) else {
            return Ok(false);
        };
        let data: Value = match serde_json::from_str(raw) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "Unreadable field payload");
                return Ok(false);
            }
        };

        let Some(pos) = host.pos_at_coords(event.coords()) else {
            debug!("Drop outside the document");
            return Ok(true);
        };

        if self.handle_outside {
            self.sink.emit(FieldEvent::DropOutside {
                pos,
                data,
                event: event.clone(),
            });
            return Ok(true);
        }

        let payload = match DropPayload::deserialize(&data) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Field payload has no usable attrs");
                return Ok(false);
            }
        };

        let state = host.state();
        if let Err(err) = create_field(state.schema(), &payload.attrs, vec![]) {
            warn!(error = %err, "Field payload has invalid attrs");
            return Ok(false);
        }

        let command = insert_field(pos, payload.attrs);
        if !command.validate(&state)? {
            warn!(pos, "Drop position does not accept fields");
            return Ok(true);
        }

        let mut pending = None;
        command.execute(&state, Some(&mut |tr: Transaction| pending = Some(tr)))?;
        if let Some(tr) = pending {
            host.dispatch(tr)?;
        }
        Ok(true)
    }
}

impl fmt::Debug for FieldDropPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDropPlugin")
            .field("handle_outside", &self.handle_outside)
            .finish()
    }
}

/// Reports pasted fields to the application without consuming the paste
pub struct FieldPastePlugin {
    sink: Rc<dyn EventSink>,
}

impl FieldPastePlugin {
    pub const KEY: &'static str = "placeholderFieldPaste";

    pub fn new(sink: Rc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl EditorPlugin for FieldPastePlugin {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn handle_paste(
        &self,
        _host: &dyn EditorHost,
        event: &RawEvent,
        slice: &Fragment,
    ) -> ViewResult<bool> {
        let content: Vec<_> = slice.iter().filter(|node| is_field(node)).cloned().collect();
        if !content.is_empty() {
            debug!(fields = content.len(), "Fields pasted");
            self.sink.emit(FieldEvent::Paste {
                content,
                event: event.clone(),
            });
        }
        Ok(false)
    }
}

impl fmt::Debug for FieldPastePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPastePlugin").finish()
    }
}
