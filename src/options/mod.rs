//! Centralized renderer options with TOML preset support.
//!
//! Post-processing toggles, debug visualization and frame setup are
//! consolidated here. Options serialize to/from TOML so presets can live
//! next to the application.

mod debug;
mod frame;
mod post_processing;

use std::path::Path;

pub use debug::DebugOptions;
pub use frame::FrameOptions;
pub use post_processing::PostProcessingOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DeferredError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[debug]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Post-processing effect toggles and parameters.
    pub post_processing: PostProcessingOptions,
    /// Debug visualization options.
    pub debug: DebugOptions,
    /// Per-frame setup.
    pub frame: FrameOptions,
}

impl Options {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Io`] if the file cannot be read, or
    /// [`DeferredError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, DeferredError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DeferredError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::OptionsParse`] if serialization fails, or
    /// [`DeferredError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), DeferredError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DeferredError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(DeferredError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
