//! Error types for the local cache store

use std::path::PathBuf;

/// Errors from the storage backend
///
/// Malformed cached content is not an error; it degrades to an empty cache.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing a key
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Records could not be encoded
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
