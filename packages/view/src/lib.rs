//! # Fieldmark View
//!
//! Presentation and input handling for placeholder fields.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   state / dispatch   ┌──────────────────────────────┐
//! │  EditorHost  │ ←─────────────────── │ FieldView (one per field)    │
//! │  (MemoryHost)│                      │  - KindHandler by kind       │
//! └──────────────┘ ←──────┐             │  - click / double click      │
//!                         │             └──────────────┬───────────────┘
//!                  ┌──────┴───────┐                    │
//!                  │  PluginSet   │── FieldEvent ──→ EventSink
//!                  │ drop / paste │
//!                  └──────────────┘
//! ```
//!
//! The host owns the document. Views and plugins read its state, build
//! transactions with `fieldmark-editor` commands and dispatch them back.

mod errors;
mod events;
mod handlers;
mod host;
mod node_view;
mod plugins;

#[cfg(feature = "async")]
pub use events::AsyncChannelSink;
pub use events::{ChannelSink, Coords, EventSink, FieldEvent, PosAccessor, RawEvent};
pub use errors::{ViewError, ViewResult};
pub use handlers::{HandlerRegistry, ImageHandler, KindHandler, LinkHandler, TextHandler};
pub use host::{EditorHost, MemoryHost};
pub use node_view::{field_style, FieldView, FieldViews, ViewContext, ViewState};
pub use plugins::{DropPayload, EditorPlugin, FieldDropPlugin, FieldPastePlugin, PluginSet};
