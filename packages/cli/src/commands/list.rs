use super::Workspace;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fieldmark_editor::{all_fields, fields_by_id, fields_by_name, LocatedField};
use serde_json::json;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Document JSON file
    pub document: String,

    /// Only fields with these ids
    #[arg(long = "id")]
    pub ids: Vec<String>,

    /// Only fields with these names
    #[arg(long = "name", conflicts_with = "ids")]
    pub names: Vec<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn list(args: ListArgs, cwd: &str) -> Result<()> {
    let workspace = Workspace::open(&args.document, cwd)?;
    let doc = workspace.state.doc();

    let fields = if !args.ids.is_empty() {
        fields_by_id(doc, args.ids)
    } else if !args.names.is_empty() {
        fields_by_name(doc, args.names)
    } else {
        all_fields(doc)
    };

    if args.json {
        let entries: Vec<_> = fields
            .iter()
            .map(|field| json!({ "pos": field.pos, "attrs": field.node.attrs() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if fields.is_empty() {
        println!("{}", "No fields found".yellow());
        return Ok(());
    }

    println!("Found {} fields", fields.len());
    for field in &fields {
        println!("  {}", describe(field));
    }
    Ok(())
}

fn describe(field: &LocatedField) -> String {
    let attrs = field.attrs();
    let value = match attrs.value() {
        Some(value) if !value.is_empty() => value.green().to_string(),
        _ => "(empty)".dimmed().to_string(),
    };
    format!(
        "{:>5}  {} {} {} {} = {}",
        field.pos,
        attrs.kind().to_string().cyan(),
        attrs.id().unwrap_or("-").bright_white(),
        attrs.name().unwrap_or("-"),
        attrs.label().map(|label| format!("\"{}\"", label)).unwrap_or_default().dimmed(),
        value
    )
}
