//! Loader settings.

use std::path::Path;

use serde::Deserialize;

use crate::loader::{DataLoadError, Format, deserialize_file, deserialize_str};

/// Fallback language id used when a text has no entry for the UI language.
pub const DEFAULT_LANGUAGE: u32 = 44;

/// Settings that steer a catalog load.
///
/// Every field is optional in the file; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// UI language id used when resolving texts.
    pub language: u32,
    /// Size of the text-loading worker pool. `None` uses rayon's default.
    pub worker_threads: Option<usize>,
    /// Extension directory names to ignore.
    pub disabled_extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE,
            worker_threads: None,
            disabled_extensions: Vec::new(),
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, DataLoadError> {
        deserialize_str(content, Format::Toml, Path::new("<inline>"))
    }

    /// Load settings from a RON, TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DataLoadError> {
        deserialize_file(path)
    }

    pub fn is_extension_enabled(&self, name: &str) -> bool {
        !self.disabled_extensions.iter().any(|d| d == name)
    }
}
