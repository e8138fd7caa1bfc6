//! Errors for the fallible edges of the crate: documents and files.
//!
//! Store operations themselves never fail; a stale id is a no-op.

use std::path::PathBuf;

use thiserror::Error;

/// Why a document could not be read or written.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("document root must be a JSON object")]
    NotAnObject,

    #[error("schemaVersion must be a non-negative integer, got {found}")]
    InvalidVersion { found: String },

    #[error("unsupported schemaVersion {version}")]
    UnsupportedVersion { version: u64 },

    #[error("missing or non-array collection '{name}'")]
    MissingCollection { name: &'static str },

    #[error("malformed document: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid document name: '{name}'")]
    InvalidName { name: String },

    #[error("document not found: '{name}'")]
    NotFound { name: String },

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("failed to encode settings: {0}")]
    Settings(#[source] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
