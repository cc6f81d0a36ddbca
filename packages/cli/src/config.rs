use anyhow::Context;
use fieldmark_editor::{FieldAttributeSpec, FieldNodeOptions, DEFAULT_FIELD_COLOR};
use fieldmark_model::AttrValidator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "fieldmark.config.json";

/// Fieldmark configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Color given to fields that do not set one
    #[serde(default = "default_color")]
    pub default_color: String,

    /// Application-defined field attributes
    #[serde(default)]
    pub extra_attributes: BTreeMap<String, ExtraAttribute>,
}

fn default_color() -> String {
    DEFAULT_FIELD_COLOR.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraAttribute {
    #[serde(default)]
    pub default: Value,

    /// Allowed JSON types, e.g. `"string|null"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Field node options described by this config
    pub fn field_options(&self) -> anyhow::Result<FieldNodeOptions> {
        let mut options = FieldNodeOptions::default().with_color(self.default_color.clone());
        for (name, extra) in &self.extra_attributes {
            let mut spec = FieldAttributeSpec::new(extra.default.clone());
            if let Some(types) = &extra.validate {
                let validator = AttrValidator::types(types)
                    .with_context(|| format!("Extra attribute `{}`", name))?;
                spec = spec.validated(validator);
            }
            options = options.with_extra_attribute(name.clone(), spec);
        }
        Ok(options)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_color: default_color(),
            extra_attributes: BTreeMap::new(),
        }
    }
}
