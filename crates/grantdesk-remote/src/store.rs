//! Remote store abstraction

use crate::error::RemoteError;
use async_trait::async_trait;
use grantdesk_model::{Project, ProjectId};
use std::fmt::Debug;

/// Shared document store holding one document per project
#[async_trait]
pub trait RemoteStore: Send + Sync + Debug {
    /// Read a project by id; `Ok(None)` when no document exists
    async fn fetch_project(&self, id: &ProjectId) -> Result<Option<Project>, RemoteError>;

    /// Write a project, replacing any existing document
    ///
    /// The stored copy carries a fresh `lastUpdated` stamp; the caller's
    /// record is not modified.
    async fn save_project(&self, project: &Project) -> Result<(), RemoteError>;

    /// Read the well-known health document to test reachability and access
    ///
    /// A missing health document still proves the store is reachable.
    async fn probe_health(&self) -> Result<(), RemoteError>;
}

/// Remote used when no store is configured; every call fails as unreachable
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedRemote;

const NOT_CONFIGURED: &str = "remote store is not configured";

#[async_trait]
impl RemoteStore for DisconnectedRemote {
    async fn fetch_project(&self, _id: &ProjectId) -> Result<Option<Project>, RemoteError> {
        Err(RemoteError::Transport(NOT_CONFIGURED.into()))
    }

    async fn save_project(&self, _project: &Project) -> Result<(), RemoteError> {
        Err(RemoteError::Transport(NOT_CONFIGURED.into()))
    }

    async fn probe_health(&self) -> Result<(), RemoteError> {
        Err(RemoteError::Transport(NOT_CONFIGURED.into()))
    }
}
