//! # Fieldmark Editor
//!
//! Placeholder fields for the fieldmark document model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: placeholderField node type + DOM    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ locator: find fields by id/name/range       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ commands: insert/update/delete/replace      │
//! │  - one transaction per command              │
//! │  - positions remapped through each step     │
//! │  - stale targets skipped                    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldmark_editor::{replace_fields_with_value, update_fields_by_id, Command, ResolverRegistry};
//!
//! let mut pending = None;
//! update_fields_by_id("1", attrs).execute(&state, Some(&mut |tr| pending = Some(tr)))?;
//! if let Some(tr) = pending.take() {
//!     state = state.apply(&tr)?;
//! }
//!
//! // finalize: fields become plain content, outside undo history
//! replace_fields_with_value("1", ResolverRegistry::new()).execute(&state, Some(&mut dispatch))?;
//! ```

mod commands;
mod errors;
mod locator;
mod resolvers;
mod schema;

pub use commands::{
    build_replacer, delete_fields, delete_fields_by_id, delete_fields_by_name, insert_field,
    replace_fields_with_value, replace_fields_with_value_by_name, update_field_attrs,
    update_fields_by_id, update_fields_by_name, Command, DeleteFields, DeleteMatchingFields,
    Dispatch, InsertField, ReplaceFieldsWithValue, Replacer, Target, UpdateFieldAttrs,
    UpdateMatchingFields,
};
pub use errors::{CommandError, CommandResult};
pub use locator::{
    all_fields, field_at, fields_by_id, fields_by_name, fields_in_range, fields_where, is_field,
    Identity, LocatedField,
};
pub use resolvers::{
    ImageResolver, LinkResolver, ReplaceContext, Resolver, ResolverRegistry, TextResolver,
};
pub use schema::{
    create_field, field_type, FieldAttributeSpec, FieldAttrs, FieldKind, FieldNodeOptions,
    FieldSchema, GetFromDomFn, SetDomAttrFn, BUILTIN_ATTRIBUTES, DEFAULT_FIELD_COLOR,
    FIELD_CLASS, FIELD_CONTENT_CLASS, FIELD_MARKER_ATTR, FIELD_PAYLOAD_KEY, FIELD_TYPE_NAME,
};

// Re-export model types for convenience
pub use fieldmark_model::{Attrs, EditorState, Node, Schema, Transaction};
