use super::{emit, resolve, Workspace};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use fieldmark_editor::{
    build_replacer, update_fields_by_id, update_fields_by_name, Attrs, Command, EditorState,
    ResolverRegistry, Transaction, UpdateMatchingFields,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use tracing::info;

#[derive(Debug, Args)]
pub struct FillArgs {
    /// Document JSON file
    pub document: String,

    /// JSON object mapping field ids (or names with --by-name) to values
    #[arg(short, long)]
    pub values: String,

    /// Match value keys against field names instead of ids
    #[arg(long)]
    pub by_name: bool,

    /// Replace the filled fields with their final content
    #[arg(long)]
    pub finalize: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn fill(args: FillArgs, cwd: &str) -> Result<()> {
    let workspace = Workspace::open(&args.document, cwd)?;
    let values = read_values(&args.values, cwd)?;

    let (state, report) = fill_state(workspace.state, &values, args.by_name, args.finalize)?;

    let output = serde_json::to_string_pretty(&state.to_json())?;
    if let Some(path) = emit(&output, args.out.as_deref(), cwd)? {
        println!(
            "  {} Filled {} fields{} → {}",
            "✓".green(),
            report.filled,
            if report.finalized { " and finalized" } else { "" },
            path.display()
        );
    }
    for key in &report.unmatched {
        eprintln!("  {} No field matches `{}`", "⚠️".yellow(), key);
    }
    Ok(())
}

/// Outcome of a fill run
#[derive(Debug, Default, PartialEq)]
pub struct FillReport {
    pub filled: usize,
    pub unmatched: Vec<String>,
    pub finalized: bool,
}

fn read_values(path: &str, cwd: &str) -> Result<BTreeMap<String, String>> {
    let path = resolve(path, cwd);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let raw: BTreeMap<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} must be a JSON object", path.display()))?;

    raw.into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(_) | Value::Bool(_) => Ok((key, value.to_string())),
            other => Err(anyhow!("Value for `{}` must be a string, found {}", key, other)),
        })
        .collect()
}

fn run(state: &EditorState, command: &impl Command) -> Result<EditorState> {
    let mut pending = None;
    command.execute(state, Some(&mut |tr: Transaction| pending = Some(tr)))?;
    let next = match pending {
        Some(tr) => state.apply(&tr)?,
        None => state.clone(),
    };
    Ok(next)
}

/// Set each field's value, then optionally finalize the matched fields
pub fn fill_state(
    mut state: EditorState,
    values: &BTreeMap<String, String>,
    by_name: bool,
    finalize: bool,
) -> Result<(EditorState, FillReport)> {
    let mut report = FillReport::default();
    let mut matched = Vec::new();

    for (key, value) in values {
        let mut attrs = Attrs::new();
        attrs.insert("value".to_string(), Value::from(value.as_str()));
        let command: UpdateMatchingFields = if by_name {
            update_fields_by_name(key, attrs)
        } else {
            update_fields_by_id(key, attrs)
        };

        let found = command.target.locate(state.doc()).len();
        if found == 0 {
            report.unmatched.push(key.clone());
            continue;
        }
        state = run(&state, &command)?;
        report.filled += found;
        matched.push(key.clone());
        info!(key = %key, found, "Field value set");
    }

    if finalize && !matched.is_empty() {
        let replacer = build_replacer(ResolverRegistry::with_builtin_resolvers());
        let command = if by_name {
            replacer.by_name(matched)
        } else {
            replacer.by_id(matched)
        };
        state = run(&state, &command)?;
        report.finalized = true;
    }

    Ok((state, report))
}
