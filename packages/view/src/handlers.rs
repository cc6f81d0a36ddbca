//! # Kind Handlers
//!
//! A handler fills the content element of a field view for one
//! [`FieldKind`]. Unregistered kinds render with the text handler.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fieldmark_editor::{FieldAttrs, FieldKind};
use fieldmark_model::{DomNode, Node};
use tracing::debug;

/// Renders the content of a field view
pub trait KindHandler {
    /// Fill `root` for a freshly built view
    fn build(&self, node: &Node, root: &mut DomNode);

    /// Refresh `root` after the node changed
    fn update(&self, node: &Node, root: &mut DomNode) {
        self.build(node, root);
    }
}

fn content_mut(root: &mut DomNode) -> Option<&mut DomNode> {
    root.first_element_child_mut()
}

/// `value`, or `label` when the value is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct TextHandler;

impl KindHandler for TextHandler {
    fn build(&self, node: &Node, root: &mut DomNode) {
        if let Some(content) = content_mut(root) {
            content.remove_style("display");
            content.set_text_content(FieldAttrs::of(node).display_text());
        }
    }
}

/// Anchor to the value, opening in a new tab
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkHandler;

impl KindHandler for LinkHandler {
    fn build(&self, node: &Node, root: &mut DomNode) {
        let attrs = FieldAttrs::of(node);
        let Some(content) = content_mut(root) else {
            return;
        };
        content.remove_style("display");
        match attrs.value() {
            Some(href) if !href.is_empty() => {
                let anchor = DomNode::element("a")
                    .with_attr("href", href)
                    .with_attr("target", "_blank")
                    .with_style("text-decoration", "none")
                    .with_child(DomNode::text(href));
                content.replace_children(vec![anchor]);
            }
            _ => content.set_text_content(attrs.label().unwrap_or_default()),
        }
    }
}

/// Inline image of the value
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHandler;

impl KindHandler for ImageHandler {
    fn build(&self, node: &Node, root: &mut DomNode) {
        let attrs = FieldAttrs::of(node);
        match attrs.value() {
            Some(src) if !src.is_empty() => {
                root.set_style("display", "inline-block");
                let image = DomNode::element("img")
                    .with_attr("src", src)
                    .with_attr("alt", attrs.label().unwrap_or_default())
                    .with_style("height", "auto")
                    .with_style("max-width", "100%")
                    .with_style("pointer-events", "none")
                    .with_style("vertical-align", "middle");
                if let Some(content) = content_mut(root) {
                    content.set_style("display", "inline-block");
                    content.replace_children(vec![image]);
                }
            }
            _ => {
                root.remove_style("display");
                if let Some(content) = content_mut(root) {
                    content.remove_style("display");
                    content.set_text_content(attrs.label().unwrap_or_default());
                }
            }
        }
    }
}

/// Handlers keyed by kind, with the text handler as the guaranteed default
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<FieldKind, Rc<dyn KindHandler>>,
    fallback: Rc<dyn KindHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Registry holding only the text handler
    pub fn new() -> Self {
        let text: Rc<dyn KindHandler> = Rc::new(TextHandler);
        let mut handlers = HashMap::new();
        handlers.insert(FieldKind::Text, text.clone());
        Self {
            handlers,
            fallback: text,
        }
    }

    /// Registry with the link and image handlers added
    pub fn with_builtin_handlers() -> Self {
        Self::new()
            .with(FieldKind::Link, LinkHandler)
            .with(FieldKind::Image, ImageHandler)
    }

    pub fn register(&mut self, kind: impl Into<FieldKind>, handler: impl KindHandler + 'static) {
        self.handlers.insert(kind.into(), Rc::new(handler));
    }

    pub fn with(mut self, kind: impl Into<FieldKind>, handler: impl KindHandler + 'static) -> Self {
        self.register(kind, handler);
        self
    }

    pub fn contains(&self, kind: &FieldKind) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn handler_for(&self, kind: &FieldKind) -> &dyn KindHandler {
        match self.handlers.get(kind) {
            Some(handler) => handler.as_ref(),
            None => {
                debug!(kind = %kind, "No view handler registered, using text handler");
                self.fallback.as_ref()
            }
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(FieldKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmark_editor::{create_field, FieldSchema, FIELD_CONTENT_CLASS};
    use fieldmark_model::{Attrs, Schema};
    use serde_json::json;

    fn field(kind: &str, value: &str, label: &str) -> Node {
        let schema = FieldSchema::default()
            .install(Schema::basic_builder())
            .build()
            .unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("kind".to_string(), json!(kind));
        attrs.insert("value".to_string(), json!(value));
        attrs.insert("label".to_string(), json!(label));
        create_field(&schema, &attrs, vec![]).unwrap()
    }

    fn root() -> DomNode {
        DomNode::element("span").with_child(
            DomNode::element("span").with_attr("class", FIELD_CONTENT_CLASS),
        )
    }

    #[test]
    fn test_text_handler() {
        let mut dom = root();
        TextHandler.build(&field("text", "", "Name"), &mut dom);
        assert_eq!(dom.text_content(), "Name");
        TextHandler.update(&field("text", "Ada", "Name"), &mut dom);
        assert_eq!(dom.text_content(), "Ada");
    }

    #[test]
    fn test_link_handler() {
        let mut dom = root();
        LinkHandler.build(&field("link", "https://example.com", "Site"), &mut dom);
        let anchor = dom.first_element_child().unwrap().first_element_child().unwrap();
        assert_eq!(anchor.tag(), Some("a"));
        assert_eq!(anchor.attr("target"), Some("_blank"));
        assert_eq!(anchor.style("text-decoration"), Some("none"));

        LinkHandler.update(&field("link", "", "Site"), &mut dom);
        assert_eq!(dom.text_content(), "Site");
    }

    #[test]
    fn test_image_handler_toggles_display() {
        let mut dom = root();
        ImageHandler.build(&field("image", "cat.png", "Cat"), &mut dom);
        assert_eq!(dom.style("display"), Some("inline-block"));
        let image = dom.first_element_child().unwrap().first_element_child().unwrap();
        assert_eq!(image.attr("src"), Some("cat.png"));

        ImageHandler.update(&field("image", "", "Cat"), &mut dom);
        assert_eq!(dom.style("display"), None);
        assert_eq!(dom.text_content(), "Cat");
    }

    #[test]
    fn test_unknown_kind_falls_back_to_text() {
        let registry = HandlerRegistry::with_builtin_handlers();
        let node = field("unknown-widget", "hi", "");
        let mut dom = root();
        registry
            .handler_for(&FieldAttrs::of(&node).kind())
            .build(&node, &mut dom);
        assert_eq!(dom.text_content(), "hi");
        assert!(!HandlerRegistry::new().contains(&FieldKind::Link));
    }
}
