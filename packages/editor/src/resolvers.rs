//! # Replacement Resolvers
//!
//! A resolver turns one field into permanent document content when the
//! field is finalized. Resolvers are looked up by [`FieldKind`]; kinds with
//! no registered resolver use the text resolver.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fieldmark_model::{Attrs, Mark, Node, Schema, Transaction};
use serde_json::Value;
use tracing::debug;

use crate::errors::CommandResult;
use crate::schema::{FieldAttrs, FieldKind};

/// Everything a resolver needs to finalize one field
#[derive(Debug, Clone, Copy)]
pub struct ReplaceContext<'a> {
    pub schema: &'a Schema,
    /// The field as located in the base document
    pub node: &'a Node,
    /// Position of the field in the base document
    pub pos: usize,
    /// Start of the field in the transaction's current document
    pub from: usize,
    /// End of the field in the transaction's current document
    pub to: usize,
    /// Marks active at `from`
    pub marks: &'a [Mark],
}

impl<'a> ReplaceContext<'a> {
    pub fn attrs(&self) -> FieldAttrs<'a> {
        FieldAttrs::of(self.node)
    }

    /// The field's value, or a single space when it is empty. Text nodes
    /// cannot be empty.
    pub fn value_or_space(&self) -> &'a str {
        match self.attrs().value() {
            Some(value) if !value.is_empty() => value,
            _ => " ",
        }
    }
}

/// Finalizes a field of one kind
pub trait Resolver: Send + Sync {
    /// Replace `ctx.from..ctx.to` in `tr` with final content
    fn replace(&self, ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()>;
}

impl<F> Resolver for F
where
    F: Fn(&ReplaceContext<'_>, &mut Transaction) -> CommandResult<()> + Send + Sync,
{
    fn replace(&self, ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()> {
        self(ctx, tr)
    }
}

/// Plain text run of the value, carrying the marks at the field
#[derive(Debug, Clone, Copy, Default)]
pub struct TextResolver;

impl Resolver for TextResolver {
    fn replace(&self, ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()> {
        let text = ctx.schema.text(ctx.value_or_space(), ctx.marks.to_vec())?;
        tr.replace_with(ctx.from, ctx.to, text)?;
        Ok(())
    }
}

/// Text run of the value linked to itself through the `link` mark
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver;

impl Resolver for LinkResolver {
    fn replace(&self, ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()> {
        let value = ctx.value_or_space();
        let mut attrs = Attrs::new();
        attrs.insert("href".to_string(), Value::from(value));
        attrs.insert("title".to_string(), Value::from(""));
        let link = ctx.schema.mark("link", &attrs)?;
        let text = ctx.schema.text(value, link.add_to_set(ctx.marks))?;
        tr.replace_with(ctx.from, ctx.to, text)?;
        Ok(())
    }
}

/// `image` node with the value as `src`, or a space when there is no value
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResolver;

impl Resolver for ImageResolver {
    fn replace(&self, ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()> {
        let replacement = match ctx.attrs().value() {
            Some(src) if !src.is_empty() => {
                let mut attrs = Attrs::new();
                attrs.insert("src".to_string(), Value::from(src));
                ctx.schema.node("image", &attrs, vec![], vec![])?
            }
            _ => ctx.schema.text(" ", ctx.marks.to_vec())?,
        };
        tr.replace_with(ctx.from, ctx.to, replacement)?;
        Ok(())
    }
}

/// Resolvers keyed by kind, with the text resolver as the guaranteed default
#[derive(Clone)]
pub struct ResolverRegistry {
    resolvers: HashMap<FieldKind, Arc<dyn Resolver>>,
    fallback: Arc<dyn Resolver>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverRegistry {
    /// Registry holding only the text resolver
    pub fn new() -> Self {
        let text: Arc<dyn Resolver> = Arc::new(TextResolver);
        let mut resolvers = HashMap::new();
        resolvers.insert(FieldKind::Text, text.clone());
        Self {
            resolvers,
            fallback: text,
        }
    }

    /// Registry with the link and image resolvers added
    pub fn with_builtin_resolvers() -> Self {
        Self::new()
            .with(FieldKind::Link, LinkResolver)
            .with(FieldKind::Image, ImageResolver)
    }

    pub fn register(&mut self, kind: impl Into<FieldKind>, resolver: impl Resolver + 'static) {
        self.resolvers.insert(kind.into(), Arc::new(resolver));
    }

    pub fn with(mut self, kind: impl Into<FieldKind>, resolver: impl Resolver + 'static) -> Self {
        self.register(kind, resolver);
        self
    }

    pub fn contains(&self, kind: &FieldKind) -> bool {
        self.resolvers.contains_key(kind)
    }

    /// Resolver for `kind`, falling back to the text resolver
    pub fn resolver_for(&self, kind: &FieldKind) -> &dyn Resolver {
        match self.resolvers.get(kind) {
            Some(resolver) => resolver.as_ref(),
            None => {
                debug!(kind = %kind, "No resolver registered, using text resolver");
                self.fallback.as_ref()
            }
        }
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.resolvers.keys().map(FieldKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ResolverRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{create_field, FieldSchema};
    use fieldmark_model::EditorState;
    use serde_json::json;

    fn setup(kind: &str, value: Option<&str>) -> (EditorState, Node) {
        let schema = Arc::new(
            FieldSchema::default()
                .install(Schema::basic_builder())
                .build()
                .unwrap(),
        );
        let mut attrs = Attrs::new();
        attrs.insert("kind".to_string(), json!(kind));
        if let Some(value) = value {
            attrs.insert("value".to_string(), json!(value));
        }
        let field = create_field(&schema, &attrs, vec![]).unwrap();
        let paragraph = schema
            .node("paragraph", &Attrs::new(), vec![field.clone()], vec![])
            .unwrap();
        let doc = schema.node("doc", &Attrs::new(), vec![paragraph], vec![]).unwrap();
        (EditorState::new(schema, doc), field)
    }

    fn run(registry: &ResolverRegistry, state: &EditorState, field: &Node) -> Transaction {
        run_with_marks(registry, state, field, &[])
    }

    fn run_with_marks(
        registry: &ResolverRegistry,
        state: &EditorState,
        field: &Node,
        marks: &[Mark],
    ) -> Transaction {
        let mut tr = state.tr();
        let ctx = ReplaceContext {
            schema: state.schema(),
            node: field,
            pos: 1,
            from: 1,
            to: 2,
            marks,
        };
        let kind = FieldAttrs::of(field).kind();
        registry.resolver_for(&kind).replace(&ctx, &mut tr).unwrap();
        tr
    }

    #[test]
    fn test_text_resolver_space_for_empty() {
        let (state, field) = setup("text", Some(""));
        let tr = run(&ResolverRegistry::new(), &state, &field);
        assert_eq!(tr.doc().text_content(), " ");
    }

    #[test]
    fn test_link_resolver() {
        let (state, field) = setup("link", Some("https://example.com"));
        let tr = run(&ResolverRegistry::with_builtin_resolvers(), &state, &field);
        let text = tr.doc().node_at(1).unwrap();
        assert_eq!(text.text(), Some("https://example.com"));
        assert_eq!(text.marks()[0].name(), "link");
        assert_eq!(text.marks()[0].attr("href"), Some(&json!("https://example.com")));
    }

    #[test]
    fn test_image_resolver() {
        let (state, field) = setup("image", Some("cat.png"));
        let tr = run(&ResolverRegistry::with_builtin_resolvers(), &state, &field);
        let image = tr.doc().node_at(1).unwrap();
        assert_eq!(image.type_name(), "image");
        assert_eq!(image.attr("src"), Some(&json!("cat.png")));

        let (state, field) = setup("image", None);
        let tr = run(&ResolverRegistry::with_builtin_resolvers(), &state, &field);
        assert_eq!(tr.doc().text_content(), " ");
    }

    #[test]
    fn test_link_resolver_keeps_inherited_marks() {
        let (state, field) = setup("link", Some("https://example.com"));
        let strong = state.schema().mark("strong", &Attrs::new()).unwrap();
        let tr = run_with_marks(
            &ResolverRegistry::with_builtin_resolvers(),
            &state,
            &field,
            &[strong],
        );
        let text = tr.doc().node_at(1).unwrap();
        let mut names: Vec<&str> = text.marks().iter().map(Mark::name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["link", "strong"]);
    }

    #[test]
    fn test_image_resolver_space_for_empty_value() {
        let (state, field) = setup("image", Some(""));
        let tr = run(&ResolverRegistry::with_builtin_resolvers(), &state, &field);
        let text = tr.doc().node_at(1).unwrap();
        assert_eq!(text.text(), Some(" "));
        assert_eq!(tr.doc().child(0).unwrap().child_count(), 1);
    }

    #[test]
    fn test_unknown_kind_uses_text_resolver() {
        let (state, field) = setup("unknown-widget", Some("hi"));
        let tr = run(&ResolverRegistry::with_builtin_resolvers(), &state, &field);
        assert_eq!(tr.doc().text_content(), "hi");
    }

    fn shout(ctx: &ReplaceContext<'_>, tr: &mut Transaction) -> CommandResult<()> {
        let text = ctx.schema.text(ctx.value_or_space().to_uppercase(), vec![])?;
        tr.replace_with(ctx.from, ctx.to, text)?;
        Ok(())
    }

    #[test]
    fn test_function_resolver() {
        let (state, field) = setup("shout", Some("hi"));
        let registry = ResolverRegistry::new().with("shout", shout);
        let tr = run(&registry, &state, &field);
        assert_eq!(tr.doc().text_content(), "HI");
    }
}
