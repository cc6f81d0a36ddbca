pub mod fill;
pub mod list;
pub mod render;

pub use fill::{fill, FillArgs};
pub use list::{list, ListArgs};
pub use render::{render, RenderArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use fieldmark_editor::FieldSchema;
use fieldmark_model::{EditorState, Schema};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Field schema and document loaded under one config
pub struct Workspace {
    pub fields: FieldSchema,
    pub state: EditorState,
}

impl Workspace {
    pub fn open(path: &str, cwd: &str) -> Result<Self> {
        let config = Config::load(cwd)?;
        let fields = FieldSchema::new(config.field_options()?);
        let schema = Arc::new(fields.install(Schema::basic_builder()).build()?);

        let path = resolve(path, cwd);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("{} is not JSON", path.display()))?;
        let state = EditorState::from_json(schema, &json)
            .with_context(|| format!("{} is not a valid document", path.display()))?;

        Ok(Self { fields, state })
    }
}

pub fn resolve(path: &str, cwd: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(cwd).join(path)
    }
}

/// Write to `out` when given, stdout otherwise
pub fn emit(content: &str, out: Option<&str>, cwd: &str) -> Result<Option<PathBuf>> {
    match out {
        Some(out) => {
            let path = resolve(out, cwd);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            Ok(Some(path))
        }
        None => {
            println!("{}", content);
            Ok(None)
        }
    }
}
