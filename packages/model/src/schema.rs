//! # Schema
//!
//! Node and mark types with their attribute tables.
//!
//! A [`Schema`] is built once and shared behind an `Arc`. Every node and mark
//! carries a handle to its type, so attribute defaults and validation travel
//! with the value rather than being looked up globally.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::{Fragment, Node};

/// Attribute bag shared by nodes and marks
pub type Attrs = BTreeMap<String, Value>;

/// JSON value categories accepted by [`AttrValidator::Types`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl ValueType {
    fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "string" => Some(ValueType::String),
            "number" => Some(ValueType::Number),
            "boolean" => Some(ValueType::Boolean),
            "null" => Some(ValueType::Null),
            "object" => Some(ValueType::Object),
            "array" => Some(ValueType::Array),
            _ => None,
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Null => ValueType::Null,
            Value::Object(_) => ValueType::Object,
            Value::Array(_) => ValueType::Array,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

/// Custom validation hook
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Attribute validator
#[derive(Clone)]
pub enum AttrValidator {
    /// Value must be one of the listed JSON types (`"string|null"`)
    Types(Vec<ValueType>),
    /// Arbitrary check supplied by the embedding application
    Custom(ValidateFn),
}

impl AttrValidator {
    /// Parse a `|`-separated type list such as `"string|null"`
    pub fn types(spec: &str) -> ModelResult<Self> {
        let types = spec
            .split('|')
            .map(|name| {
                ValueType::parse(name).ok_or_else(|| {
                    ModelError::InvalidSchema(format!("unknown attribute type `{}`", name.trim()))
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(AttrValidator::Types(types))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        AttrValidator::Custom(Arc::new(f))
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            AttrValidator::Types(types) => {
                let actual = ValueType::of(value);
                if types.contains(&actual) {
                    Ok(())
                } else {
                    let expected: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
                    Err(format!("expected {}, got {}", expected.join("|"), actual.as_str()))
                }
            }
            AttrValidator::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for AttrValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValidator::Types(types) => f.debug_tuple("Types").field(types).finish(),
            AttrValidator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One entry of an attribute table
#[derive(Debug, Clone, Default)]
pub struct AttributeSpec {
    /// Value used when the attribute is not given. `None` makes it required.
    pub default: Option<Value>,
    pub validate: Option<AttrValidator>,
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self::default()
    }

    pub fn with_default(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            validate: None,
        }
    }

    pub fn validated(mut self, validator: AttrValidator) -> Self {
        self.validate = Some(validator);
        self
    }
}

/// What a node type accepts as children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    Block,
    Inline,
}

/// Declaration of a node type
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub content: Option<ContentRule>,
    pub inline: bool,
    pub atom: bool,
    pub selectable: bool,
    pub draggable: bool,
    pub group: Option<String>,
    pub attrs: BTreeMap<String, AttributeSpec>,
}

impl NodeSpec {
    pub fn block(content: ContentRule) -> Self {
        Self {
            content: Some(content),
            selectable: true,
            group: Some("block".to_string()),
            ..Default::default()
        }
    }

    pub fn inline_leaf() -> Self {
        Self {
            inline: true,
            atom: true,
            selectable: true,
            group: Some("inline".to_string()),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

/// Declaration of a mark type
#[derive(Debug, Clone)]
pub struct MarkSpec {
    /// Whether the mark extends to content typed at its end
    pub inclusive: bool,
    pub attrs: BTreeMap<String, AttributeSpec>,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            inclusive: true,
            attrs: BTreeMap::new(),
        }
    }
}

impl MarkSpec {
    pub fn with_attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

fn compute_attrs(
    type_name: &str,
    table: &BTreeMap<String, AttributeSpec>,
    given: &Attrs,
) -> ModelResult<Attrs> {
    let mut attrs = Attrs::new();
    for (name, spec) in table {
        let value = match given.get(name) {
            Some(value) => value.clone(),
            None => spec.default.clone().ok_or_else(|| ModelError::MissingAttribute {
                type_name: type_name.to_string(),
                attr: name.clone(),
            })?,
        };
        if let Some(validator) = &spec.validate {
            validator
                .check(&value)
                .map_err(|reason| ModelError::invalid_attribute(type_name, name.as_str(), reason))?;
        }
        attrs.insert(name.clone(), value);
    }

    for key in given.keys().filter(|key| !table.contains_key(*key)) {
        warn!(type_name, attr = %key, "Dropping undeclared attribute");
    }

    Ok(attrs)
}

struct NodeTypeData {
    name: String,
    spec: NodeSpec,
}

/// Handle to a node type declared in a [`Schema`]
#[derive(Clone)]
pub struct NodeType(Arc<NodeTypeData>);

impl NodeType {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.0.spec
    }

    pub fn is_text(&self) -> bool {
        self.0.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.0.spec.inline || self.is_text()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.spec.content.is_none()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.0.spec.atom
    }

    pub fn is_textblock(&self) -> bool {
        self.0.spec.content == Some(ContentRule::Inline)
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.0
            .spec
            .group
            .as_deref()
            .map(|groups| groups.split_whitespace().any(|g| g == group))
            .unwrap_or(false)
    }

    /// Fill defaults, validate and drop undeclared attributes
    pub fn compute_attrs(&self, given: &Attrs) -> ModelResult<Attrs> {
        compute_attrs(&self.0.name, &self.0.spec.attrs, given)
    }

    /// Check that `content` is acceptable as this type's children
    pub fn check_content(&self, content: &Fragment) -> ModelResult<()> {
        match self.0.spec.content {
            None if !content.is_empty() => Err(ModelError::invalid_content(
                self.name(),
                "leaf nodes cannot have content",
            )),
            None => Ok(()),
            Some(ContentRule::Inline) => match content.iter().find(|child| !child.is_inline()) {
                Some(child) => Err(ModelError::invalid_content(
                    self.name(),
                    format!("block node {} in inline content", child.type_name()),
                )),
                None => Ok(()),
            },
            Some(ContentRule::Block) => match content.iter().find(|child| child.is_inline()) {
                Some(child) => Err(ModelError::invalid_content(
                    self.name(),
                    format!("inline node {} in block content", child.type_name()),
                )),
                None => Ok(()),
            },
        }
    }

    /// Create a node of this type
    pub fn create(&self, attrs: &Attrs, content: Fragment, marks: Vec<Mark>) -> ModelResult<Node> {
        if self.is_text() {
            return Err(ModelError::invalid_content(
                self.name(),
                "text nodes are created with Schema::text",
            ));
        }
        let attrs = self.compute_attrs(attrs)?;
        self.check_content(&content)?;
        Ok(Node::new(self.clone(), attrs, content, marks, None))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.0.name)
    }
}

struct MarkTypeData {
    name: String,
    spec: MarkSpec,
}

/// Handle to a mark type declared in a [`Schema`]
#[derive(Clone)]
pub struct MarkType(Arc<MarkTypeData>);

impl MarkType {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_inclusive(&self) -> bool {
        self.0.spec.inclusive
    }

    pub fn create(&self, attrs: &Attrs) -> ModelResult<Mark> {
        let attrs = compute_attrs(&self.0.name, &self.0.spec.attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.0.name)
    }
}

/// A set of node and mark types
#[derive(Debug)]
pub struct Schema {
    nodes: BTreeMap<String, NodeType>,
    marks: BTreeMap<String, MarkType>,
    top_node: String,
}

impl Schema {
    /// Builder preloaded with `doc`, `paragraph`, `text`, `image` and the
    /// `strong`, `em` and `link` marks
    pub fn basic_builder() -> SchemaBuilder {
        SchemaBuilder::new()
            .node("doc", NodeSpec::block(ContentRule::Block))
            .node("paragraph", NodeSpec::block(ContentRule::Inline))
            .node(
                "text",
                NodeSpec {
                    inline: true,
                    group: Some("inline".to_string()),
                    ..Default::default()
                },
            )
            .node(
                "image",
                NodeSpec {
                    draggable: true,
                    ..NodeSpec::inline_leaf()
                }
                .with_attr("src", AttributeSpec::required())
                .with_attr("alt", AttributeSpec::with_default(Value::Null))
                .with_attr("title", AttributeSpec::with_default(Value::Null)),
            )
            .mark("strong", MarkSpec::default())
            .mark("em", MarkSpec::default())
            .mark(
                "link",
                MarkSpec {
                    inclusive: false,
                    ..Default::default()
                }
                .with_attr("href", AttributeSpec::required())
                .with_attr("title", AttributeSpec::with_default(Value::Null)),
            )
    }

    pub fn node_type(&self, name: &str) -> ModelResult<&NodeType> {
        self.nodes
            .get(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    pub fn mark_type(&self, name: &str) -> ModelResult<&MarkType> {
        self.marks
            .get(name)
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))
    }

    pub fn has_node_type(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn top_node_type(&self) -> ModelResult<&NodeType> {
        self.node_type(&self.top_node)
    }

    /// Create a node by type name
    pub fn node(
        &self,
        name: &str,
        attrs: &Attrs,
        content: Vec<Node>,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        self.node_type(name)?
            .create(attrs, Fragment::from_nodes(content), marks)
    }

    /// Create a text node. Empty text is rejected.
    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> ModelResult<Node> {
        let text = text.into();
        if text.is_empty() {
            return Err(ModelError::invalid_content("text", "empty text nodes are not allowed"));
        }
        let node_type = self.node_type("text")?.clone();
        Ok(Node::new(node_type, Attrs::new(), Fragment::empty(), marks, Some(text)))
    }

    /// Create a mark by type name
    pub fn mark(&self, name: &str, attrs: &Attrs) -> ModelResult<Mark> {
        self.mark_type(name)?.create(attrs)
    }
}

/// Incremental [`Schema`] construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<(String, NodeSpec)>,
    marks: Vec<(String, MarkSpec)>,
    top_node: Option<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a node type
    pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        let name = name.into();
        self.nodes.retain(|(existing, _)| *existing != name);
        self.nodes.push((name, spec));
        self
    }

    /// Add or replace a mark type
    pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        let name = name.into();
        self.marks.retain(|(existing, _)| *existing != name);
        self.marks.push((name, spec));
        self
    }

    pub fn top_node(mut self, name: impl Into<String>) -> Self {
        self.top_node = Some(name.into());
        self
    }

    pub fn build(self) -> ModelResult<Schema> {
        let top_node = self.top_node.unwrap_or_else(|| "doc".to_string());

        let nodes: BTreeMap<String, NodeType> = self
            .nodes
            .into_iter()
            .map(|(name, spec)| {
                let node_type = NodeType(Arc::new(NodeTypeData {
                    name: name.clone(),
                    spec,
                }));
                (name, node_type)
            })
            .collect();

        let marks = self
            .marks
            .into_iter()
            .map(|(name, spec)| {
                let mark_type = MarkType(Arc::new(MarkTypeData {
                    name: name.clone(),
                    spec,
                }));
                (name, mark_type)
            })
            .collect();

        if !nodes.contains_key("text") {
            return Err(ModelError::InvalidSchema("schema needs a `text` node type".to_string()));
        }
        if !nodes.contains_key(&top_node) {
            return Err(ModelError::InvalidSchema(format!(
                "top node type `{}` is not declared",
                top_node
            )));
        }

        Ok(Schema {
            nodes,
            marks,
            top_node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_list_validator() {
        let validator = AttrValidator::types("string|null").unwrap();
        assert!(validator.check(&json!("x")).is_ok());
        assert!(validator.check(&Value::Null).is_ok());
        assert!(validator.check(&json!(3)).is_err());
    }

    #[test]
    fn test_unknown_type_name_rejected() {
        assert!(AttrValidator::types("string|widget").is_err());
    }

    #[test]
    fn test_compute_attrs_fills_defaults_and_drops_unknown() {
        let schema = Schema::basic_builder().build().unwrap();
        let image = schema.node_type("image").unwrap();

        let mut given = Attrs::new();
        given.insert("src".to_string(), json!("a.png"));
        given.insert("bogus".to_string(), json!(1));

        let attrs = image.compute_attrs(&given).unwrap();
        assert_eq!(attrs.get("src"), Some(&json!("a.png")));
        assert_eq!(attrs.get("alt"), Some(&Value::Null));
        assert!(!attrs.contains_key("bogus"));
    }

    #[test]
    fn test_missing_required_attribute() {
        let schema = Schema::basic_builder().build().unwrap();
        let err = schema.node("image", &Attrs::new(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, ModelError::MissingAttribute { .. }));
    }

    #[test]
    fn test_schema_requires_text_type() {
        let result = SchemaBuilder::new()
            .node("doc", NodeSpec::block(ContentRule::Block))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_groups() {
        let schema = Schema::basic_builder().build().unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert!(paragraph.is_in_group("block"));
        assert!(paragraph.is_textblock());
        assert!(!paragraph.is_in_group("inline"));
    }
}
