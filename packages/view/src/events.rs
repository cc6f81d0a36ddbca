//! # Notifications
//!
//! Field interactions the core does not interpret are handed to the
//! embedding application through an [`EventSink`] supplied at construction.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use fieldmark_model::Node;
use serde_json::Value;
use tracing::warn;

/// Viewport coordinates of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coords {
    pub left: f64,
    pub top: f64,
}

/// An input event as delivered by the host. Carries the pointer position and
/// the side-channel data of drag and clipboard events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEvent {
    pub kind: String,
    pub client_x: f64,
    pub client_y: f64,
    pub data: BTreeMap<String, String>,
}

impl RawEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, client_x: f64, client_y: f64) -> Self {
        self.client_x = client_x;
        self.client_y = client_y;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Side-channel entry; empty entries count as absent
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn coords(&self) -> Coords {
        Coords {
            left: self.client_x,
            top: self.client_y,
        }
    }
}

/// Live position of a node view, read when needed rather than cached
#[derive(Clone)]
pub struct PosAccessor(Rc<dyn Fn() -> Option<usize>>);

impl PosAccessor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Option<usize> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Accessor that always reports the same position
    pub fn fixed(pos: usize) -> Self {
        Self::new(move || Some(pos))
    }

    pub fn get(&self) -> Option<usize> {
        (self.0)()
    }
}

impl fmt::Debug for PosAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PosAccessor({:?})", self.get())
    }
}

/// Field notification
#[derive(Debug, Clone)]
pub enum FieldEvent {
    Click {
        node: Node,
        get_pos: PosAccessor,
        event: RawEvent,
    },

    DoubleClick {
        node: Node,
        get_pos: PosAccessor,
        event: RawEvent,
    },

    /// Field payload dropped while the drop plugin leaves insertion to the
    /// application
    DropOutside {
        pos: usize,
        data: Value,
        event: RawEvent,
    },

    /// Pasted content contained fields at its top level
    Paste { content: Vec<Node>, event: RawEvent },
}

impl FieldEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FieldEvent::Click { .. } => "placeholderFieldClick",
            FieldEvent::DoubleClick { .. } => "placeholderFieldDoubleClick",
            FieldEvent::DropOutside { .. } => "placeholderFieldDrop",
            FieldEvent::Paste { .. } => "placeholderFieldPaste",
        }
    }
}

/// Receiver of field notifications
pub trait EventSink {
    fn emit(&self, event: FieldEvent);
}

impl<F> EventSink for F
where
    F: Fn(FieldEvent),
{
    fn emit(&self, event: FieldEvent) {
        self(event)
    }
}

/// Forwards notifications into a std channel
#[derive(Debug, Clone)]
pub struct ChannelSink(pub std::sync::mpsc::Sender<FieldEvent>);

impl EventSink for ChannelSink {
    fn emit(&self, event: FieldEvent) {
        let name = event.name();
        if self.0.send(event).is_err() {
            warn!(event = name, "Event receiver dropped");
        }
    }
}

/// Forwards notifications into a tokio channel, for applications that
/// consume them from a local task
#[cfg(feature = "async")]
#[derive(Debug, Clone)]
pub struct AsyncChannelSink(pub tokio::sync::mpsc::UnboundedSender<FieldEvent>);

#[cfg(feature = "async")]
impl EventSink for AsyncChannelSink {
    fn emit(&self, event: FieldEvent) {
        let name = event.name();
        if self.0.send(event).is_err() {
            warn!(event = name, "Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |event: FieldEvent| seen.borrow_mut().push(event.name())
        };
        sink.emit(FieldEvent::Paste {
            content: vec![],
            event: RawEvent::new("paste"),
        });
        assert_eq!(*seen.borrow(), vec!["placeholderFieldPaste"]);
    }

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let sink = ChannelSink(tx);
        sink.emit(FieldEvent::DropOutside {
            pos: 3,
            data: Value::Null,
            event: RawEvent::new("drop"),
        });
        assert!(matches!(rx.try_recv(), Ok(FieldEvent::DropOutside { pos: 3, .. })));
    }

    #[test]
    fn test_channel_sink_tolerates_closed_receiver() {
        let (tx, rx) = std::sync::mpsc::channel();
        drop(rx);
        ChannelSink(tx).emit(FieldEvent::Paste {
            content: vec![],
            event: RawEvent::new("paste"),
        });
    }

    #[test]
    fn test_empty_data_is_absent() {
        let event = RawEvent::new("drop").with_data("placeholderField", "");
        assert_eq!(event.data("placeholderField"), None);
    }

    #[test]
    fn test_pos_accessor_reads_live_value() {
        let cell = Rc::new(std::cell::Cell::new(Some(4)));
        let accessor = {
            let cell = cell.clone();
            PosAccessor::new(move || cell.get())
        };
        assert_eq!(accessor.get(), Some(4));
        cell.set(None);
        assert_eq!(accessor.get(), None);
    }
}
