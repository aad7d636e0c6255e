//! `.inherit.toml` project configuration.
//!
//! ```toml
//! pattern = '(?m)^@import\s+"([^"]+)"'
//! include_all = false
//! original_paths = false
//! normalize = "basename"   # or "absolute" (default)
//! strip_prefix = "_"
//! ```
//!
//! Only a pattern extractor can be configured from a file. Function
//! extractors go through [`EngineBuilder::extract_with`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineBuilder};
use crate::error::InheritError;
use crate::normalize::PathNormalizer;
use crate::record::Record;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = ".inherit.toml";

/// How identity keys are derived from paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    #[default]
    Absolute,
    Basename,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub original_paths: bool,
    #[serde(default)]
    pub normalize: NormalizeMode,
    /// Characters trimmed from the start of basename keys.
    #[serde(default)]
    pub strip_prefix: String,
}

impl EngineConfig {
    /// Builder preloaded with these options.
    #[must_use]
    pub fn builder<R: Record>(&self) -> EngineBuilder<R> {
        let mut builder = Engine::<R>::builder()
            .include_all(self.include_all)
            .original_paths(self.original_paths);
        if let Some(pattern) = &self.pattern {
            builder = builder.pattern(pattern.clone());
        }
        if self.normalize == NormalizeMode::Basename {
            builder = builder.normalize_with(PathNormalizer::basename(self.strip_prefix.clone()));
        }
        builder
    }

    /// Build an engine directly from the configuration.
    ///
    /// # Errors
    ///
    /// Fails with the construction errors of [`EngineBuilder::build`], most
    /// commonly [`InheritError::MissingExtractor`] when `pattern` is unset.
    pub fn build<R: Record>(&self) -> Result<Engine<R>, InheritError> {
        self.builder().build()
    }
}

/// Load `.inherit.toml` from `project_root`, or defaults when it is absent.
///
/// # Errors
///
/// Returns [`InheritError::Read`] or [`InheritError::ConfigParse`] when the
/// file exists but cannot be read or parsed.
pub fn load_config(project_root: &Path) -> Result<EngineConfig, InheritError> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    load_config_file(&path)
}

/// Load a configuration file from an explicit path.
///
/// # Errors
///
/// Returns [`InheritError::Read`] or [`InheritError::ConfigParse`].
pub fn load_config_file(path: &Path) -> Result<EngineConfig, InheritError> {
    let content = std::fs::read_to_string(path).map_err(|source| InheritError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<EngineConfig>(&content).map_err(|source| InheritError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
