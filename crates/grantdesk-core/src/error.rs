//! Error types for the workspace controller
//!
//! Remote failures never appear here: they are folded into connectivity
//! status and banners at the call site.

use grantdesk_generation::GenerationError;
use grantdesk_store::StoreError;

/// Workspace operation failure
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// City name was empty after trimming
    #[error("city name is empty")]
    EmptyCityName,

    /// Strategy generation failed; nothing was committed
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The local cache could not be read or written
    #[error("local cache error: {0}")]
    Store(#[from] StoreError),

    /// Share link base is not a URL
    #[error("invalid share base url: {0}")]
    InvalidShareBase(#[from] url::ParseError),
}

impl WorkspaceError {
    /// Whether trying again may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_retryable(),
            Self::Store(_) => true,
            Self::EmptyCityName | Self::InvalidShareBase(_) => false,
        }
    }
}
