//! Error types for xmlmelt.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal errors. Any of these aborts the active pass.
#[derive(Debug, Error)]
pub enum XmlMeltError {
    /// The source document is malformed or truncated.
    #[error("Document parse error at byte {position}: {message}")]
    DocumentParse { position: u64, message: String },

    /// An artifact could not be opened, read or written.
    #[error("IO error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl XmlMeltError {
    /// Create a document parse error at the given byte offset.
    pub fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::DocumentParse {
            position,
            message: message.into(),
        }
    }

    /// Attach a path to an IO error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type alias for xmlmelt operations.
pub type Result<T> = std::result::Result<T, XmlMeltError>;
