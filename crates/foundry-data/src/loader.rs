//! Shared loading plumbing: error type, document parsing through the VFS,
//! and format detection for the loader's own settings files.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use foundry_xml::{Context, ParseError, XmlLoader};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::vfs::Vfs;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required document was not found in the virtual filesystem.
    #[error("required file '{path}' not found")]
    MissingFile { path: String },

    /// A required directory was not found in the virtual filesystem.
    #[error("required directory '{path}' not found")]
    MissingDirectory { path: String },

    /// A document could not be parsed.
    #[error("parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },

    /// The settings file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// The settings file could not be deserialized.
    #[error("invalid configuration in {file}: {detail}")]
    Config { file: PathBuf, detail: String },

    /// The text-loading worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Document parsing
// ===========================================================================

/// Open `path` in `vfs` and stream it through `loader`, starting at `root`.
pub fn parse_document<C: Context>(
    vfs: &dyn Vfs,
    path: &str,
    loader: &mut XmlLoader<C>,
    root: C,
) -> Result<(), DataLoadError> {
    let reader = vfs.open(path).ok_or_else(|| DataLoadError::MissingFile {
        path: path.to_string(),
    })?;
    loader
        .parse(BufReader::new(reader), root)
        .map_err(|source| DataLoadError::Parse {
            file: path.to_string(),
            source,
        })
}

/// Like [`parse_document`], for documents that are allowed to be absent or
/// broken (extension files). Returns whether the document was consumed.
pub fn parse_optional_document<C: Context>(
    vfs: &dyn Vfs,
    path: &str,
    loader: &mut XmlLoader<C>,
    root: C,
) -> bool {
    match parse_document(vfs, path, loader, root) {
        Ok(()) => true,
        Err(DataLoadError::MissingFile { .. }) => false,
        Err(e) => {
            warn!("skipping {path}: {e}");
            false
        }
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported settings file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Deserialize `content` in the given format.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let config_error = |detail: String| DataLoadError::Config {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| config_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| config_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| config_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Tests
// ===========================================================================
