//! JSON form of documents, compatible with the ProseMirror node shape:
//!
//! ```json
//! { "type": "paragraph", "attrs": {}, "content": [ { "type": "text", "text": "hi", "marks": [ { "type": "em" } ] } ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::{Fragment, Node};
use crate::schema::{Attrs, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkJson {
    #[serde(rename = "type")]
    mark_type: String,

    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    node_type: String,

    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<MarkJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl NodeJson {
    fn from_node(node: &Node) -> Self {
        Self {
            node_type: node.type_name().to_string(),
            attrs: node.attrs().clone(),
            content: node.children().map(NodeJson::from_node).collect(),
            marks: node
                .marks()
                .iter()
                .map(|mark| MarkJson {
                    mark_type: mark.name().to_string(),
                    attrs: mark.attrs().clone(),
                })
                .collect(),
            text: node.text().map(str::to_string),
        }
    }

    fn into_node(self, schema: &Schema) -> ModelResult<Node> {
        let marks = self
            .marks
            .iter()
            .map(|mark| schema.mark(&mark.mark_type, &mark.attrs))
            .collect::<ModelResult<Vec<Mark>>>()?;

        if self.node_type == "text" {
            let text = self
                .text
                .ok_or_else(|| ModelError::invalid_content("text", "text node without text"))?;
            return schema.text(text, marks);
        }

        let content = self
            .content
            .into_iter()
            .map(|child| child.into_node(schema))
            .collect::<ModelResult<Vec<Node>>>()?;

        schema.node(&self.node_type, &self.attrs, content, marks)
    }
}

impl Node {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(NodeJson::from_node(self)).unwrap_or(Value::Null)
    }

    /// Parse and validate a node against `schema`
    pub fn from_json(schema: &Schema, value: &Value) -> ModelResult<Node> {
        let json: NodeJson = serde_json::from_value(value.clone())?;
        json.into_node(schema)
    }
}

impl Fragment {
    /// Parse a JSON array of nodes
    pub fn from_json(schema: &Schema, value: &Value) -> ModelResult<Fragment> {
        let items: Vec<NodeJson> = serde_json::from_value(value.clone())?;
        let nodes = items
            .into_iter()
            .map(|item| item.into_node(schema))
            .collect::<ModelResult<Vec<Node>>>()?;
        Ok(Fragment::from_nodes(nodes))
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Node::to_json).collect())
    }
}
