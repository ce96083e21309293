//! Generation failures

/// Failure while producing a strategy or discovering grants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The service did not answer in time
    #[error("generation timed out: {0}")]
    Timeout(String),

    /// Connection failure before a response arrived
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error status
    #[error("generation service error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message reported by the service
        message: String,
    },

    /// The service answered without any content
    #[error("empty response from generation service")]
    EmptyResponse,

    /// The content could not be interpreted
    #[error("malformed generation output: {0}")]
    Malformed(String),

    /// Client settings are unusable
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
}

impl GenerationError {
    /// Whether trying again may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::EmptyResponse | Self::Malformed(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidConfig(_) => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Api {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
