//! # Field Schema
//!
//! The `placeholderField` node type: attribute table, DOM output and
//! DOM parsing.
//!
//! ```text
//! <span class="placeholder-field" data-placeholder-field data-id=".." data-kind=".." ...>
//!   <span class="placeholder-field__content" contenteditable="false">label</span>
//! </span>
//! ```
//!
//! The six built-in attributes round-trip through `data-<name>` attributes.
//! Extra attributes declared by the embedding application carry their own
//! default, validator and optional DOM hooks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fieldmark_model::{
    AttrValidator, AttributeSpec, Attrs, DomAttrs, DomNode, Mark, Node, NodeSpec, NodeType,
    Schema, SchemaBuilder, ValueType,
};
use serde_json::Value;

use crate::errors::{CommandError, CommandResult};

pub const FIELD_TYPE_NAME: &str = "placeholderField";
pub const FIELD_CLASS: &str = "placeholder-field";
pub const FIELD_CONTENT_CLASS: &str = "placeholder-field__content";
pub const FIELD_MARKER_ATTR: &str = "data-placeholder-field";
/// Key of the field payload in drag data
pub const FIELD_PAYLOAD_KEY: &str = "placeholderField";
pub const DEFAULT_FIELD_COLOR: &str = "#7c3aed";

/// Built-in attributes, in DOM output order
pub const BUILTIN_ATTRIBUTES: [&str; 6] = ["id", "kind", "name", "value", "label", "color"];

/// Reads an extra attribute from a parsed element. `None` keeps the default.
pub type GetFromDomFn = Arc<dyn Fn(&DomNode) -> Option<Value> + Send + Sync>;

/// Writes an extra attribute into the element attributes being rendered
pub type SetDomAttrFn = Arc<dyn Fn(&Value, &mut DomAttrs) + Send + Sync>;

/// Declaration of an application-defined field attribute
#[derive(Clone)]
pub struct FieldAttributeSpec {
    pub default: Value,
    pub validate: Option<AttrValidator>,
    pub get_from_dom: Option<GetFromDomFn>,
    pub set_dom_attr: Option<SetDomAttrFn>,
}

impl FieldAttributeSpec {
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
            validate: None,
            get_from_dom: None,
            set_dom_attr: None,
        }
    }

    pub fn validated(mut self, validator: AttrValidator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn with_get_from_dom<F>(mut self, f: F) -> Self
    where
        F: Fn(&DomNode) -> Option<Value> + Send + Sync + 'static,
    {
        self.get_from_dom = Some(Arc::new(f));
        self
    }

    pub fn with_set_dom_attr<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &mut DomAttrs) + Send + Sync + 'static,
    {
        self.set_dom_attr = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FieldAttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAttributeSpec")
            .field("default", &self.default)
            .field("validate", &self.validate)
            .field("get_from_dom", &self.get_from_dom.is_some())
            .field("set_dom_attr", &self.set_dom_attr.is_some())
            .finish()
    }
}

/// Options for the field node type
#[derive(Debug, Clone)]
pub struct FieldNodeOptions {
    pub default_color: String,
    pub extra_attributes: BTreeMap<String, FieldAttributeSpec>,
}

impl Default for FieldNodeOptions {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_FIELD_COLOR.to_string(),
            extra_attributes: BTreeMap::new(),
        }
    }
}

impl FieldNodeOptions {
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    pub fn with_extra_attribute(mut self, name: impl Into<String>, spec: FieldAttributeSpec) -> Self {
        self.extra_attributes.insert(name.into(), spec);
        self
    }
}

/// The field node type and its DOM contract
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    options: FieldNodeOptions,
}

impl FieldSchema {
    pub fn new(options: FieldNodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FieldNodeOptions {
        &self.options
    }

    /// Node declaration: inline atom, selectable and draggable
    pub fn node_spec(&self) -> NodeSpec {
        let string_or_null = || AttrValidator::Types(vec![ValueType::String, ValueType::Null]);

        let mut spec = NodeSpec {
            draggable: true,
            group: Some(format!("{} inline", FIELD_TYPE_NAME)),
            ..NodeSpec::inline_leaf()
        };
        for name in BUILTIN_ATTRIBUTES {
            let default = match name {
                "kind" => Value::from("text"),
                "color" => Value::from(self.options.default_color.clone()),
                _ => Value::Null,
            };
            spec = spec.with_attr(
                name,
                AttributeSpec::with_default(default).validated(string_or_null()),
            );
        }
        for (name, extra) in &self.options.extra_attributes {
            spec = spec.with_attr(
                name.clone(),
                AttributeSpec {
                    default: Some(extra.default.clone()),
                    validate: extra.validate.clone(),
                },
            );
        }
        spec
    }

    /// Register the field node type on a schema under construction
    pub fn install(&self, builder: SchemaBuilder) -> SchemaBuilder {
        builder.node(FIELD_TYPE_NAME, self.node_spec())
    }

    /// Wrapper attributes for a field node. Null built-ins come out as
    /// `Value::Null` so that applying them removes stale attributes.
    pub fn dom_attrs(&self, node: &Node) -> DomAttrs {
        let mut attrs = DomAttrs::new();
        attrs.insert("class".to_string(), Value::from(FIELD_CLASS));
        attrs.insert(FIELD_MARKER_ATTR.to_string(), Value::from(""));
        for name in BUILTIN_ATTRIBUTES {
            let value = node.attr(name).map(dom_value).unwrap_or(Value::Null);
            attrs.insert(format!("data-{}", name), value);
        }
        for (name, extra) in &self.options.extra_attributes {
            if let Some(set_dom_attr) = &extra.set_dom_attr {
                let value = node.attr(name).cloned().unwrap_or(Value::Null);
                set_dom_attr(&value, &mut attrs);
            }
        }
        attrs
    }

    /// Static DOM output for serialization
    pub fn to_dom(&self, node: &Node) -> DomNode {
        let mut wrapper = DomNode::element("span");
        wrapper.update_attributes(&self.dom_attrs(node), &[]);

        let label = FieldAttrs::of(node).label().unwrap_or_default().to_string();
        let mut content = DomNode::element("span")
            .with_attr("class", FIELD_CONTENT_CLASS)
            .with_attr("contenteditable", "false");
        content.set_text_content(&label);

        wrapper.with_child(content)
    }

    /// Read field attributes back from a rendered wrapper. Returns `None`
    /// for anything that is not a `span[data-placeholder-field]`.
    pub fn parse_dom(&self, dom: &DomNode) -> Option<Attrs> {
        if dom.tag() != Some("span") || !dom.has_attr(FIELD_MARKER_ATTR) {
            return None;
        }

        let mut attrs = Attrs::new();
        for name in BUILTIN_ATTRIBUTES {
            if let Some(value) = dom.attr(&format!("data-{}", name)) {
                attrs.insert(name.to_string(), Value::from(value));
            }
        }
        for (name, extra) in &self.options.extra_attributes {
            if let Some(get_from_dom) = &extra.get_from_dom {
                match get_from_dom(dom) {
                    Some(Value::Null) | None => {}
                    Some(value) => {
                        attrs.insert(name.clone(), value);
                    }
                }
            }
        }
        Some(attrs)
    }
}

fn dom_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

/// The field node type of `schema`
pub fn field_type(schema: &Schema) -> CommandResult<&NodeType> {
    schema
        .node_type(FIELD_TYPE_NAME)
        .map_err(|_| CommandError::MissingFieldType(FIELD_TYPE_NAME.to_string()))
}

/// Create a field node with `attrs` merged over the schema defaults
pub fn create_field(schema: &Schema, attrs: &Attrs, marks: Vec<Mark>) -> CommandResult<Node> {
    let node = field_type(schema)?.create(attrs, Default::default(), marks)?;
    Ok(node)
}

/// Rendering and replacement strategy of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Text,
    Link,
    Image,
    Custom(String),
}

impl FieldKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "text" => FieldKind::Text,
            "link" => FieldKind::Link,
            "image" => FieldKind::Image,
            other => FieldKind::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Link => "link",
            FieldKind::Image => "image",
            FieldKind::Custom(kind) => kind,
        }
    }
}

impl From<&str> for FieldKind {
    fn from(kind: &str) -> Self {
        FieldKind::parse(kind)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed read view over a field node's attributes
#[derive(Debug, Clone, Copy)]
pub struct FieldAttrs<'a> {
    attrs: &'a Attrs,
}

impl<'a> FieldAttrs<'a> {
    pub fn new(attrs: &'a Attrs) -> Self {
        Self { attrs }
    }

    pub fn of(node: &'a Node) -> Self {
        Self::new(node.attrs())
    }

    fn string(&self, key: &str) -> Option<&'a str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.string("id")
    }

    /// Kind of the field; a missing or null kind is `Text`
    pub fn kind(&self) -> FieldKind {
        self.string("kind").map(FieldKind::parse).unwrap_or(FieldKind::Text)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.string("name")
    }

    pub fn value(&self) -> Option<&'a str> {
        self.string("value")
    }

    pub fn label(&self) -> Option<&'a str> {
        self.string("label")
    }

    pub fn color(&self) -> Option<&'a str> {
        self.string("color").filter(|color| !color.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.attrs.get(key)
    }

    /// `value` when non-empty, else `label`, else empty
    pub fn display_text(&self) -> &'a str {
        match self.value() {
            Some(value) if !value.is_empty() => value,
            _ => self.label().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(options: FieldNodeOptions) -> (FieldSchema, Schema) {
        let fields = FieldSchema::new(options);
        let schema = fields.install(Schema::basic_builder()).build().unwrap();
        (fields, schema)
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let (_, schema) = schema(FieldNodeOptions::default());
        let node = create_field(&schema, &Attrs::new(), vec![]).unwrap();
        let field = FieldAttrs::of(&node);
        assert_eq!(field.kind(), FieldKind::Text);
        assert_eq!(field.color(), Some(DEFAULT_FIELD_COLOR));
        assert_eq!(field.id(), None);
        assert_eq!(node.node_size(), 1);
        assert!(node.node_type().is_in_group("inline"));
        assert!(node.node_type().is_in_group(FIELD_TYPE_NAME));
    }

    #[test]
    fn test_custom_default_color() {
        let (_, schema) = schema(FieldNodeOptions::default().with_color("#ff0000"));
        let node = create_field(&schema, &Attrs::new(), vec![]).unwrap();
        assert_eq!(FieldAttrs::of(&node).color(), Some("#ff0000"));
    }

    #[test]
    fn test_builtin_validation() {
        let (_, schema) = schema(FieldNodeOptions::default());
        let err = create_field(&schema, &attrs(&[("id", json!(7))]), vec![]).unwrap_err();
        assert!(matches!(err, CommandError::Model(_)));
    }

    #[test]
    fn test_missing_field_type() {
        let schema = Schema::basic_builder().build().unwrap();
        assert_eq!(
            field_type(&schema).unwrap_err(),
            CommandError::MissingFieldType(FIELD_TYPE_NAME.to_string())
        );
    }

    #[test]
    fn test_to_dom() {
        let (fields, schema) = schema(FieldNodeOptions::default());
        let node = create_field(
            &schema,
            &attrs(&[("id", json!("1")), ("label", json!("Name"))]),
            vec![],
        )
        .unwrap();
        let dom = fields.to_dom(&node);
        assert_eq!(dom.attr("class"), Some(FIELD_CLASS));
        assert_eq!(dom.attr("data-id"), Some("1"));
        assert_eq!(dom.attr("data-kind"), Some("text"));
        assert!(dom.has_attr(FIELD_MARKER_ATTR));
        assert!(!dom.has_attr("data-value"));

        let content = dom.first_element_child().unwrap();
        assert_eq!(content.attr("class"), Some(FIELD_CONTENT_CLASS));
        assert_eq!(content.attr("contenteditable"), Some("false"));
        assert_eq!(content.text_content(), "Name");
    }

    #[test]
    fn test_parse_dom_round_trip() {
        let (fields, schema) = schema(FieldNodeOptions::default());
        let node = create_field(
            &schema,
            &attrs(&[("id", json!("a")), ("name", json!("n")), ("value", json!("v"))]),
            vec![],
        )
        .unwrap();
        let parsed = fields.parse_dom(&fields.to_dom(&node)).unwrap();
        let reparsed = create_field(&schema, &parsed, vec![]).unwrap();
        assert_eq!(reparsed, node);
    }

    #[test]
    fn test_parse_dom_requires_marker() {
        let fields = FieldSchema::default();
        assert!(fields.parse_dom(&DomNode::element("span")).is_none());
        assert!(fields
            .parse_dom(&DomNode::element("div").with_attr(FIELD_MARKER_ATTR, ""))
            .is_none());
    }

    #[test]
    fn test_extra_attribute_hooks() {
        let required = FieldAttributeSpec::new(false)
            .validated(AttrValidator::types("boolean").unwrap())
            .with_get_from_dom(|dom| dom.has_attr("data-required").then(|| Value::Bool(true)))
            .with_set_dom_attr(|value, attrs| {
                if value.as_bool() == Some(true) {
                    attrs.insert("data-required".to_string(), Value::from("true"));
                }
            });
        let (fields, schema) =
            schema(FieldNodeOptions::default().with_extra_attribute("required", required));

        let plain = create_field(&schema, &Attrs::new(), vec![]).unwrap();
        assert_eq!(plain.attr("required"), Some(&json!(false)));
        assert!(!fields.to_dom(&plain).has_attr("data-required"));

        let marked = create_field(&schema, &attrs(&[("required", json!(true))]), vec![]).unwrap();
        let dom = fields.to_dom(&marked);
        assert_eq!(dom.attr("data-required"), Some("true"));
        assert_eq!(fields.parse_dom(&dom).unwrap().get("required"), Some(&json!(true)));
    }

    #[test]
    fn test_display_text() {
        let with_value = attrs(&[("value", json!("42")), ("label", json!("X"))]);
        assert_eq!(FieldAttrs::new(&with_value).display_text(), "42");

        let empty_value = attrs(&[("value", json!("")), ("label", json!("X"))]);
        assert_eq!(FieldAttrs::new(&empty_value).display_text(), "X");

        assert_eq!(FieldAttrs::new(&Attrs::new()).display_text(), "");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(FieldKind::parse("link"), FieldKind::Link);
        assert_eq!(
            FieldKind::parse("unknown-widget"),
            FieldKind::Custom("unknown-widget".to_string())
        );
        assert_eq!(FieldKind::Image.to_string(), "image");
    }
}
