//! Error types for the remote document store
//!
//! The reconciliation layer words its banners differently for a denied
//! request and a missing document, so every failure is classified.

/// Remote store failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Credentials or security rules refused the request
    #[error("access denied: {0}")]
    Denied(String),

    /// The addressed document does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure, timeout or unexpected status
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with something that is not a project document
    #[error("malformed document: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Classify a non-success HTTP status
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Denied(message),
            404 => Self::NotFound(message),
            _ if mentions_permission(&message) => Self::Denied(message),
            _ => Self::Transport(format!("status {status}: {message}")),
        }
    }

    /// Whether access was refused
    #[inline]
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Whether the document is missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_status(status.as_u16(), error.to_string());
        }
        if error.is_timeout() {
            return Self::Transport(format!("request timed out: {error}"));
        }
        Self::Transport(error.to_string())
    }
}

fn mentions_permission(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("permission") || lower.contains("permission_denied")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(RemoteError::from_status(403, "Missing or insufficient permissions.").is_denied());
        assert!(RemoteError::from_status(401, "unauthenticated").is_denied());
        assert!(RemoteError::from_status(404, "no document").is_not_found());
        assert!(matches!(
            RemoteError::from_status(503, "unavailable"),
            RemoteError::Transport(_)
        ));
    }

    #[test]
    fn permission_message_is_denied_regardless_of_status() {
        let err = RemoteError::from_status(400, "PERMISSION_DENIED: rules rejected write");
        assert!(err.is_denied());
    }
}
