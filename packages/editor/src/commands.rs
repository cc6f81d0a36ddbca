//! # Field Commands
//!
//! Batch mutations over located fields, each producing at most one
//! transaction.
//!
//! ## Execution modes
//!
//! Every command runs against an [`EditorState`] with an optional dispatch
//! sink:
//!
//! - **validation** (`None`): no transaction is built, only the success flag
//!   is reported
//! - **dispatch** (`Some(sink)`): the transaction is built and handed to the
//!   sink
//!
//! ## Batch semantics
//!
//! Targets are processed in document order. Each target position is mapped
//! through every step applied so far in the transaction, then the node now at
//! that position is re-read and checked before it is touched:
//!
//! ```text
//! base:   A [f1] B [f2] C          targets: f1@1, f2@3
//! step 1: delete 1..2      →  A B [f2] C
//! f2:     map(3) = 2, node_at(2) == f2  →  delete 2..3
//! ```
//!
//! - delete and replace require the node to equal the located node
//! - attribute updates only require the same node type
//!
//! A target that fails its check is skipped; the rest of the batch proceeds
//! and the command still succeeds.

use fieldmark_model::{Attrs, EditorState, Node, Transaction, ADD_TO_HISTORY};
use tracing::{debug, info, instrument};

use crate::errors::CommandResult;
use crate::locator::{fields_by_id, fields_by_name, Identity, LocatedField};
use crate::resolvers::{ReplaceContext, ResolverRegistry};
use crate::schema::{create_field, field_type, FieldAttrs};

/// Sink receiving the transaction built by a command
pub type Dispatch<'a> = &'a mut dyn FnMut(Transaction);

/// A command over an editor state
pub trait Command {
    /// Run the command. Without a dispatch sink only validation happens.
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool>;

    /// Would the command succeed against `state`
    fn validate(&self, state: &EditorState) -> CommandResult<bool> {
        self.execute(state, None)
    }

    /// Debug name
    fn name(&self) -> &'static str;
}

/// How a command addresses fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(Identity),
    Name(Identity),
}

impl Target {
    pub fn locate(&self, doc: &Node) -> Vec<LocatedField> {
        match self {
            Target::Id(ids) => fields_by_id(doc, ids.clone()),
            Target::Name(names) => fields_by_name(doc, names.clone()),
        }
    }
}

/// Node now sitting at the mapped position of `field`, if it is the same
/// node that was located
fn current_if_unchanged(tr: &Transaction, from: usize, field: &LocatedField) -> Option<Node> {
    let current = tr.doc().node_at(from)?;
    (current == field.node).then_some(current)
}

fn send(dispatch: Dispatch<'_>, tr: Transaction, command: &'static str) {
    info!(command, steps = tr.steps().len(), "Dispatching transaction");
    dispatch(tr);
}

/// Insert a new field at a position
#[derive(Debug, Clone, PartialEq)]
pub struct InsertField {
    pub pos: usize,
    pub attrs: Attrs,
}

impl Command for InsertField {
    #[instrument(skip(self, state, dispatch), fields(pos = self.pos))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        field_type(state.schema())?;

        let dispatch = match dispatch {
            Some(dispatch) => dispatch,
            None => {
                let valid = state
                    .doc()
                    .resolve(self.pos)
                    .map(|resolved| resolved.parent().is_textblock())
                    .unwrap_or(false);
                return Ok(valid);
            }
        };

        let resolved = state.doc().resolve(self.pos)?;
        let marks = resolved.marks();
        debug!(marks = marks.len(), "Inheriting marks at insertion point");

        let field = create_field(state.schema(), &self.attrs, marks)?;
        let mut tr = state.tr();
        tr.insert(self.pos, field)?;
        send(dispatch, tr, self.name());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "insert_field"
    }
}

/// Delete located fields that are still unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFields {
    pub fields: Vec<LocatedField>,
}

impl DeleteFields {
    pub(crate) fn apply(fields: &[LocatedField], tr: &mut Transaction) -> CommandResult<usize> {
        let mut deleted = 0;
        for field in fields {
            let from = tr.mapping().map(field.pos);
            let to = tr.mapping().map(field.end());
            if current_if_unchanged(tr, from, field).is_none() {
                debug!(pos = field.pos, mapped = from, "Skipping stale field");
                continue;
            }
            tr.delete(from, to)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

impl Command for DeleteFields {
    #[instrument(skip(self, state, dispatch), fields(targets = self.fields.len()))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        if self.fields.is_empty() {
            return Ok(true);
        }
        let Some(dispatch) = dispatch else {
            return Ok(true);
        };

        let mut tr = state.tr();
        let deleted = Self::apply(&self.fields, &mut tr)?;
        debug!(deleted, skipped = self.fields.len() - deleted, "Deleted fields");
        send(dispatch, tr, self.name());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "delete_fields"
    }
}

/// Merge attributes into located fields
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFieldAttrs {
    pub fields: Vec<LocatedField>,
    pub attrs: Attrs,
}

impl UpdateFieldAttrs {
    pub(crate) fn apply(
        fields: &[LocatedField],
        attrs: &Attrs,
        tr: &mut Transaction,
    ) -> CommandResult<usize> {
        let mut updated = 0;
        for field in fields {
            let pos = tr.mapping().map(field.pos);
            let current = match tr.doc().node_at(pos) {
                Some(current) if current.node_type() == field.node.node_type() => current,
                _ => {
                    debug!(pos = field.pos, mapped = pos, "Skipping field whose type changed");
                    continue;
                }
            };

            let mut merged = current.attrs().clone();
            merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
            tr.set_node_markup(pos, merged)?;
            updated += 1;
        }
        Ok(updated)
    }
}

impl Command for UpdateFieldAttrs {
    #[instrument(skip(self, state, dispatch), fields(targets = self.fields.len()))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        if self.fields.is_empty() {
            return Ok(true);
        }
        let Some(dispatch) = dispatch else {
            return Ok(true);
        };

        let mut tr = state.tr();
        let updated = Self::apply(&self.fields, &self.attrs, &mut tr)?;
        debug!(updated, "Updated field attributes");
        send(dispatch, tr, self.name());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "update_field_attrs"
    }
}

/// Locate fields by id or name and merge attributes into them
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMatchingFields {
    pub target: Target,
    pub attrs: Attrs,
}

impl Command for UpdateMatchingFields {
    #[instrument(skip(self, state, dispatch), fields(target = ?self.target))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        let fields = self.target.locate(state.doc());
        if fields.is_empty() {
            debug!("No matching fields");
            return Ok(true);
        }
        UpdateFieldAttrs {
            fields,
            attrs: self.attrs.clone(),
        }
        .execute(state, dispatch)
    }

    fn name(&self) -> &'static str {
        "update_matching_fields"
    }
}

/// Locate fields by id or name and delete them
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMatchingFields {
    pub target: Target,
}

impl Command for DeleteMatchingFields {
    #[instrument(skip(self, state, dispatch), fields(target = ?self.target))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        let fields = self.target.locate(state.doc());
        if fields.is_empty() {
            debug!("No matching fields");
            return Ok(true);
        }
        DeleteFields { fields }.execute(state, dispatch)
    }

    fn name(&self) -> &'static str {
        "delete_matching_fields"
    }
}

/// Replace fields with their resolved content. The transaction is kept out
/// of undo history.
#[derive(Debug, Clone)]
pub struct ReplaceFieldsWithValue {
    pub target: Target,
    pub resolvers: ResolverRegistry,
}

impl Command for ReplaceFieldsWithValue {
    #[instrument(skip(self, state, dispatch), fields(target = ?self.target))]
    fn execute(&self, state: &EditorState, dispatch: Option<Dispatch<'_>>) -> CommandResult<bool> {
        let fields = self.target.locate(state.doc());
        if fields.is_empty() {
            debug!("No matching fields");
            return Ok(true);
        }
        let Some(dispatch) = dispatch else {
            return Ok(true);
        };

        let mut tr = state.tr();
        tr.set_meta(ADD_TO_HISTORY, false);

        let mut replaced = 0;
        for field in &fields {
            let from = tr.mapping().map(field.pos);
            let to = tr.mapping().map(field.end());
            if current_if_unchanged(&tr, from, field).is_none() {
                debug!(pos = field.pos, mapped = from, "Skipping stale field");
                continue;
            }

            let marks = tr.doc().resolve(from)?.marks();
            let kind = FieldAttrs::of(&field.node).kind();
            debug!(kind = %kind, from, to, "Resolving field");

            let ctx = ReplaceContext {
                schema: state.schema(),
                node: &field.node,
                pos: field.pos,
                from,
                to,
                marks: &marks,
            };
            self.resolvers.resolver_for(&kind).replace(&ctx, &mut tr)?;
            replaced += 1;
        }

        debug!(replaced, skipped = fields.len() - replaced, "Replaced fields");
        send(dispatch, tr, self.name());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "replace_fields_with_value"
    }
}

/// Replacement command factory bound to one resolver table
#[derive(Debug, Clone, Default)]
pub struct Replacer {
    resolvers: ResolverRegistry,
}

impl Replacer {
    pub fn new(resolvers: ResolverRegistry) -> Self {
        Self { resolvers }
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn by_id(&self, ids: impl Into<Identity>) -> ReplaceFieldsWithValue {
        ReplaceFieldsWithValue {
            target: Target::Id(ids.into()),
            resolvers: self.resolvers.clone(),
        }
    }

    pub fn by_name(&self, names: impl Into<Identity>) -> ReplaceFieldsWithValue {
        ReplaceFieldsWithValue {
            target: Target::Name(names.into()),
            resolvers: self.resolvers.clone(),
        }
    }
}

pub fn insert_field(pos: usize, attrs: Attrs) -> InsertField {
    InsertField { pos, attrs }
}

pub fn delete_fields(fields: Vec<LocatedField>) -> DeleteFields {
    DeleteFields { fields }
}

pub fn update_field_attrs(fields: Vec<LocatedField>, attrs: Attrs) -> UpdateFieldAttrs {
    UpdateFieldAttrs { fields, attrs }
}

pub fn update_fields_by_id(ids: impl Into<Identity>, attrs: Attrs) -> UpdateMatchingFields {
    UpdateMatchingFields {
        target: Target::Id(ids.into()),
        attrs,
    }
}

pub fn update_fields_by_name(names: impl Into<Identity>, attrs: Attrs) -> UpdateMatchingFields {
    UpdateMatchingFields {
        target: Target::Name(names.into()),
        attrs,
    }
}

pub fn delete_fields_by_id(ids: impl Into<Identity>) -> DeleteMatchingFields {
    DeleteMatchingFields {
        target: Target::Id(ids.into()),
    }
}

pub fn delete_fields_by_name(names: impl Into<Identity>) -> DeleteMatchingFields {
    DeleteMatchingFields {
        target: Target::Name(names.into()),
    }
}

pub fn replace_fields_with_value(
    ids: impl Into<Identity>,
    resolvers: ResolverRegistry,
) -> ReplaceFieldsWithValue {
    Replacer::new(resolvers).by_id(ids)
}

pub fn replace_fields_with_value_by_name(
    names: impl Into<Identity>,
    resolvers: ResolverRegistry,
) -> ReplaceFieldsWithValue {
    Replacer::new(resolvers).by_name(names)
}

pub fn build_replacer(resolvers: ResolverRegistry) -> Replacer {
    Replacer::new(resolvers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::all_fields;
    use crate::schema::FieldSchema;
    use fieldmark_model::Schema;
    use serde_json::json;
    use std::sync::Arc;

    fn attrs(pairs: &[(&str, &str)]) -> Attrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    /// doc(p("ab" f1 "cd" f2 "ef" f3))
    fn state() -> EditorState {
        let schema = Arc::new(
            FieldSchema::default()
                .install(Schema::basic_builder())
                .build()
                .unwrap(),
        );
        let field = |id: &str| create_field(&schema, &attrs(&[("id", id)]), vec![]).unwrap();
        let paragraph = schema
            .node(
                "paragraph",
                &Attrs::new(),
                vec![
                    schema.text("ab", vec![]).unwrap(),
                    field("1"),
                    schema.text("cd", vec![]).unwrap(),
                    field("2"),
                    schema.text("ef", vec![]).unwrap(),
                    field("3"),
                ],
                vec![],
            )
            .unwrap();
        let doc = schema.node("doc", &Attrs::new(), vec![paragraph], vec![]).unwrap();
        EditorState::new(schema, doc)
    }

    fn run(command: &dyn Command, state: &EditorState) -> Option<EditorState> {
        let mut sent = None;
        let ok = command
            .execute(state, Some(&mut |tr: Transaction| sent = Some(tr)))
            .unwrap();
        assert!(ok);
        sent.map(|tr| state.apply(&tr).unwrap())
    }

    #[test]
    fn test_validation_mode_builds_nothing() {
        let state = state();
        let fields = all_fields(state.doc());
        assert!(delete_fields(fields).validate(&state).unwrap());
        assert!(insert_field(1, Attrs::new()).validate(&state).unwrap());
        assert!(!insert_field(0, Attrs::new()).validate(&state).unwrap());
        assert!(!insert_field(99, Attrs::new()).validate(&state).unwrap());
    }

    #[test]
    fn test_insert_out_of_range_is_an_error() {
        let state = state();
        let mut dispatched = false;
        let result = insert_field(99, Attrs::new())
            .execute(&state, Some(&mut |_tr: Transaction| dispatched = true));
        assert!(result.is_err());
        assert!(!dispatched);
    }

    #[test]
    fn test_batch_delete_maps_positions() {
        let state = state();
        let fields = all_fields(state.doc());
        assert_eq!(fields.iter().map(|f| f.pos).collect::<Vec<_>>(), vec![3, 6, 9]);

        let next = run(&delete_fields(fields), &state).unwrap();
        assert!(all_fields(next.doc()).is_empty());
        assert_eq!(next.doc().text_content(), "abcdef");
    }

    #[test]
    fn test_delete_skips_stale_duplicate_target() {
        let state = state();
        let fields = all_fields(state.doc());
        // the same target twice: the second read finds "cd", not the field
        let targets = vec![fields[0].clone(), fields[0].clone(), fields[2].clone()];
        let next = run(&delete_fields(targets), &state).unwrap();
        assert_eq!(next.doc().text_content(), "abcdef");
        assert_eq!(all_fields(next.doc()).len(), 1);
        assert_eq!(all_fields(next.doc())[0].attrs().id(), Some("2"));
    }

    #[test]
    fn test_empty_target_list_dispatches_nothing() {
        let state = state();
        assert!(run(&delete_fields(vec![]), &state).is_none());
        assert!(run(&update_fields_by_id("missing", Attrs::new()), &state).is_none());
        assert!(run(&delete_fields_by_name("missing"), &state).is_none());
    }

    #[test]
    fn test_update_merges_over_current_attrs() {
        let state = state();
        let fields = all_fields(state.doc());
        let first = run(&update_field_attrs(fields.clone(), attrs(&[("value", "a")])), &state)
            .unwrap();
        // same located fields, already stale by attributes
        let second =
            run(&update_field_attrs(fields, attrs(&[("label", "b")])), &first).unwrap();
        for field in all_fields(second.doc()) {
            assert_eq!(field.attrs().value(), Some("a"));
            assert_eq!(field.attrs().label(), Some("b"));
        }
    }

    #[test]
    fn test_delete_by_id_set() {
        let state = state();
        let next = run(&delete_fields_by_id(["1", "3"]), &state).unwrap();
        let remaining = all_fields(next.doc());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].pos, 5);
    }

    #[test]
    fn test_replace_is_kept_out_of_history() {
        let state = state();
        let mut sent = None;
        replace_fields_with_value("2", ResolverRegistry::new())
            .execute(&state, Some(&mut |tr: Transaction| sent = Some(tr)))
            .unwrap();
        let tr = sent.unwrap();
        assert!(!tr.add_to_history());
        assert_eq!(tr.doc().text_content(), "abcd ef");
    }

    #[test]
    fn test_replacer_by_name() {
        let schema = state().schema().clone();
        let named = create_field(
            &schema,
            &attrs(&[("name", "sig"), ("value", "Jo")]),
            vec![],
        )
        .unwrap();
        let paragraph = schema
            .node("paragraph", &Attrs::new(), vec![named.clone(), named], vec![])
            .unwrap();
        let doc = schema.node("doc", &Attrs::new(), vec![paragraph], vec![]).unwrap();
        let state = EditorState::new(schema, doc);

        let replacer = build_replacer(ResolverRegistry::new());
        let next = run(&replacer.by_name("sig"), &state).unwrap();
        assert_eq!(next.doc().text_content(), "JoJo");
        assert!(all_fields(next.doc()).is_empty());
    }
}
