//! Connectivity status
//!
//! Owned by the controller state and updated from the outcome of every
//! remote call. Nothing here talks to the network.

use grantdesk_remote::RemoteError;
use serde::Serialize;

/// What is known about the remote store right now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    /// The store answered the last request
    pub reachable: bool,
    /// The last request was refused for access reasons
    pub permission_denied: bool,
    /// Text of the last failure
    pub last_error: Option<String>,
}

impl ConnectivityStatus {
    /// Record a successful remote call
    pub fn observe_success(&mut self) {
        self.reachable = true;
        self.permission_denied = false;
        self.last_error = None;
    }

    /// Record a failed remote call
    ///
    /// A missing document or an undecodable one still proves the store
    /// answered, so only transport failures and denials mark it unreachable.
    pub fn observe_failure(&mut self, error: &RemoteError) {
        match error {
            RemoteError::Denied(_) => {
                self.reachable = false;
                self.permission_denied = true;
            }
            RemoteError::NotFound(_) | RemoteError::Malformed(_) => {
                self.reachable = true;
                self.permission_denied = false;
            }
            RemoteError::Transport(_) => {
                self.reachable = false;
            }
        }
        self.last_error = Some(error.to_string());
    }

    /// Record the outcome of any remote call
    pub fn observe<T>(&mut self, outcome: &Result<T, RemoteError>) {
        match outcome {
            Ok(_) => self.observe_success(),
            Err(e) => self.observe_failure(e),
        }
    }

    /// Forget everything; used by the access recovery action
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether cloud sync is currently usable
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.reachable && !self.permission_denied
    }
}
