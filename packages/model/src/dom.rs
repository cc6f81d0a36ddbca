use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attributes as produced by schema serializers, before they are applied to
/// an element. `null` removes an attribute.
pub type DomAttrs = BTreeMap<String, Value>;

/// Attributes treated as HTML booleans: present when truthy, absent otherwise
pub const DEFAULT_BOOLEAN_ATTRIBUTES: &[&str] = &[
    "required",
    "readonly",
    "disabled",
    "checked",
    "multiple",
    "autofocus",
];

/// Presentation tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomNode {
    /// HTML element
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        styles: BTreeMap<String, String>,
        children: Vec<DomNode>,
    },

    /// Text node
    Text { content: String },
}

impl DomNode {
    pub fn element(tag: impl Into<String>) -> Self {
        DomNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        DomNode::Text {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_style(key, value);
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.append_child(child);
        self
    }

    pub fn with_children(mut self, new_children: Vec<DomNode>) -> Self {
        if let DomNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            DomNode::Element { tag, .. } => Some(tag),
            DomNode::Text { .. } => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, DomNode::Element { .. })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            DomNode::Element { attributes, .. } => attributes.get(key).map(String::as_str),
            DomNode::Text { .. } => None,
        }
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let DomNode::Element { attributes, .. } = self {
            attributes.insert(key.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        if let DomNode::Element { attributes, .. } = self {
            attributes.remove(key);
        }
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        match self {
            DomNode::Element { styles, .. } => styles.get(key).map(String::as_str),
            DomNode::Text { .. } => None,
        }
    }

    pub fn set_style(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let DomNode::Element { styles, .. } = self {
            styles.insert(key.into(), value.into());
        }
    }

    /// Set a style property; an empty value removes it
    pub fn set_style_property(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.remove_style(key);
        } else {
            self.set_style(key, value);
        }
    }

    pub fn remove_style(&mut self, key: &str) {
        if let DomNode::Element { styles, .. } = self {
            styles.remove(key);
        }
    }

    /// Replace every style with the declarations of a `style` attribute
    /// string such as `"padding: 1px; color: red"`
    pub fn set_style_text(&mut self, text: &str) {
        if let DomNode::Element { styles, .. } = self {
            styles.clear();
            for declaration in text.split(';') {
                if let Some((key, value)) = declaration.split_once(':') {
                    let (key, value) = (key.trim(), value.trim());
                    if !key.is_empty() && !value.is_empty() {
                        styles.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }
    }

    pub fn children(&self) -> &[DomNode] {
        match self {
            DomNode::Element { children, .. } => children,
            DomNode::Text { .. } => &[],
        }
    }

    pub fn append_child(&mut self, child: DomNode) {
        if let DomNode::Element { children, .. } = self {
            children.push(child);
        }
    }

    pub fn replace_children(&mut self, new_children: Vec<DomNode>) {
        if let DomNode::Element { children, .. } = self {
            *children = new_children;
        }
    }

    pub fn first_element_child(&self) -> Option<&DomNode> {
        self.children().iter().find(|child| child.is_element())
    }

    pub fn first_element_child_mut(&mut self) -> Option<&mut DomNode> {
        match self {
            DomNode::Element { children, .. } => children.iter_mut().find(|child| child.is_element()),
            DomNode::Text { .. } => None,
        }
    }

    /// Replace all children with one text node (none for empty text)
    pub fn set_text_content(&mut self, text: &str) {
        match self {
            DomNode::Element { children, .. } => {
                children.clear();
                if !text.is_empty() {
                    children.push(DomNode::text(text));
                }
            }
            DomNode::Text { content } => *content = text.to_string(),
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            DomNode::Element { children, .. } => children.iter().map(DomNode::text_content).collect(),
            DomNode::Text { content } => content.clone(),
        }
    }

    /// Apply serialized attributes: `null` removes, boolean attributes are
    /// set empty when truthy and removed otherwise, a `style` string replaces
    /// the style map, everything else is stringified.
    pub fn update_attributes(&mut self, attrs: &DomAttrs, custom_booleans: &[&str]) {
        for (key, value) in attrs {
            let is_boolean = DEFAULT_BOOLEAN_ATTRIBUTES.contains(&key.as_str())
                || custom_booleans.contains(&key.as_str());
            if is_boolean {
                if is_truthy(value) {
                    self.set_attr(key.as_str(), "");
                } else {
                    self.remove_attr(key);
                }
                continue;
            }

            match value {
                Value::Null => {
                    if key == "style" {
                        self.set_style_text("");
                    }
                    self.remove_attr(key);
                }
                Value::String(text) if key == "style" => self.set_style_text(text),
                Value::String(text) => self.set_attr(key.as_str(), text.as_str()),
                other => self.set_attr(key.as_str(), other.to_string()),
            }
        }
    }

    /// Serialize to HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            DomNode::Text { content } => out.push_str(&escape(content, false)),
            DomNode::Element {
                tag,
                attributes,
                styles,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value, true));
                        out.push('"');
                    }
                }
                if !styles.is_empty() {
                    let style: Vec<String> = styles.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                    out.push_str(" style=\"");
                    out.push_str(&escape(&style.join("; "), true));
                    out.push('"');
                }
                if is_void(tag) {
                    out.push('>');
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr" | "input")
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_html() {
        let node = DomNode::element("span")
            .with_attr("class", "field")
            .with_style("color", "red")
            .with_child(DomNode::text("a < b"));
        assert_eq!(
            node.to_html(),
            "<span class=\"field\" style=\"color: red\">a &lt; b</span>"
        );
    }

    #[test]
    fn test_update_attributes() {
        let mut node = DomNode::element("span").with_attr("data-id", "1");
        let mut attrs = DomAttrs::new();
        attrs.insert("data-id".to_string(), Value::Null);
        attrs.insert("data-kind".to_string(), json!("text"));
        attrs.insert("disabled".to_string(), json!(true));
        attrs.insert("required".to_string(), json!(false));
        attrs.insert("style".to_string(), json!("padding: 1px 2px; color: red"));
        node.update_attributes(&attrs, &[]);

        assert!(!node.has_attr("data-id"));
        assert_eq!(node.attr("data-kind"), Some("text"));
        assert_eq!(node.attr("disabled"), Some(""));
        assert!(!node.has_attr("required"));
        assert_eq!(node.style("padding"), Some("1px 2px"));
        assert_eq!(node.style("color"), Some("red"));
    }

    #[test]
    fn test_set_text_content() {
        let mut node = DomNode::element("span").with_child(DomNode::element("b"));
        node.set_text_content("hi");
        assert_eq!(node.children(), &[DomNode::text("hi")]);
        node.set_text_content("");
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_void_elements() {
        let img = DomNode::element("img").with_attr("src", "a.png");
        assert_eq!(img.to_html(), "<img src=\"a.png\">");
    }
}
