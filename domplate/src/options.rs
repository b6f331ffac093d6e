//! Render options

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// How the global context relates to the caller's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalBinding {
    /// `global` is the data itself: `global.company`
    #[default]
    Direct,
    /// `global` is `{ "global": data }`: `global.global.company`
    Wrapped,
}

/// Options for a single render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Strip each directive attribute once it has been evaluated
    pub remove_js_attributes: bool,
    /// Shape of the value bound to `global`
    pub global_binding: GlobalBinding,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_js_attributes(mut self, remove: bool) -> Self {
        self.remove_js_attributes = remove;
        self
    }

    pub fn with_global_binding(mut self, binding: GlobalBinding) -> Self {
        self.global_binding = binding;
        self
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse render options as TOML")
    }

    /// Parse options from a JSON document
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).context("Failed to parse render options as JSON")
    }

    /// Load options from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read render options: {}", path.display()))?;

        let options = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("json") => Self::from_json_str(&source),
            other => bail!(
                "Unsupported render options format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ),
        }
        .with_context(|| format!("Invalid render options in {}", path.display()))?;

        log::debug!("Loaded render options from {}: {:?}", path.display(), options);
        Ok(options)
    }
}

/// `true` is shorthand for stripping directive attributes
impl From<bool> for RenderOptions {
    fn from(remove_js_attributes: bool) -> Self {
        Self {
            remove_js_attributes,
            ..Self::default()
        }
    }
}
