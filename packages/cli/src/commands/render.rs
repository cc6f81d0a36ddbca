use super::{emit, Workspace};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fieldmark_editor::{is_field, FieldSchema};
use fieldmark_model::{DomNode, Mark, Node};
use fieldmark_view::{
    EditorHost, EventSink, FieldEvent, FieldViews, HandlerRegistry, MemoryHost, ViewContext,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Document JSON file
    pub document: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Render link and image fields as plain text
    #[arg(long)]
    pub plain: bool,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let workspace = Workspace::open(&args.document, cwd)?;
    let handlers = if args.plain {
        HandlerRegistry::new()
    } else {
        HandlerRegistry::with_builtin_handlers()
    };

    let html = render_document(workspace.state, workspace.fields, handlers);
    if let Some(path) = emit(&html, args.out.as_deref(), cwd)? {
        println!("  {} {} → {}", "✓".green(), args.document, path.display());
    }
    Ok(())
}

/// HTML for a whole document, drawing fields through their node views
pub fn render_document(
    state: fieldmark_model::EditorState,
    fields: FieldSchema,
    handlers: HandlerRegistry,
) -> String {
    let host = Rc::new(MemoryHost::new(state));
    let sink: Rc<dyn EventSink> = Rc::new(|event: FieldEvent| {
        debug!(event = event.name(), "Ignoring field event during render");
    });
    let ctx = ViewContext::new(host.clone() as Rc<dyn EditorHost>, fields, handlers, sink);

    let mut views = FieldViews::new(ctx.clone());
    views.sync();

    let doc = host.doc();
    let renderer = Renderer {
        views: &views,
        fields: &ctx.fields,
    };
    let html = renderer
        .children(&doc, 0)
        .iter()
        .map(DomNode::to_html)
        .collect::<Vec<_>>()
        .join("\n");

    views.destroy_all();
    html
}

struct Renderer<'a> {
    views: &'a FieldViews,
    fields: &'a FieldSchema,
}

impl Renderer<'_> {
    /// Render the children of `node`, whose content starts at `start`
    fn children(&self, node: &Node, start: usize) -> Vec<DomNode> {
        let mut pos = start;
        let mut out = Vec::with_capacity(node.child_count());
        for child in node.children() {
            out.push(self.node(child, pos));
            pos += child.node_size();
        }
        out
    }

    fn node(&self, node: &Node, pos: usize) -> DomNode {
        if is_field(node) {
            return self
                .views
                .view_at(pos)
                .and_then(|view| view.dom().cloned())
                .unwrap_or_else(|| self.fields.to_dom(node));
        }
        if let Some(text) = node.text() {
            return wrap_marks(DomNode::text(text), node.marks());
        }

        let element = match node.type_name() {
            "image" => {
                let mut img = DomNode::element("img");
                for key in ["src", "alt", "title"] {
                    if let Some(Value::String(value)) = node.attr(key) {
                        img.set_attr(key, value.as_str());
                    }
                }
                img
            }
            "paragraph" => DomNode::element("p").with_children(self.children(node, pos + 1)),
            _ => DomNode::element("div").with_children(self.children(node, pos + 1)),
        };
        wrap_marks(element, node.marks())
    }
}

fn wrap_marks(inner: DomNode, marks: &[Mark]) -> DomNode {
    marks.iter().rev().fold(inner, |inner, mark| {
        let element = match mark.name() {
            "strong" => DomNode::element("strong"),
            "em" => DomNode::element("em"),
            "link" => {
                let mut anchor = DomNode::element("a");
                if let Some(Value::String(href)) = mark.attr("href") {
                    anchor.set_attr("href", href.as_str());
                }
                anchor
            }
            other => DomNode::element("span").with_attr("data-mark", other),
        };
        element.with_child(inner)
    })
}
