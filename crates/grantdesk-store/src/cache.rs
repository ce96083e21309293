//! Local cache of project records
//!
//! The whole project collection lives under one key as a JSON array; the
//! most recently active project id lives under a second key as plain text.

use crate::backend::StorageBackend;
use crate::error::StoreError;
use grantdesk_model::{Project, ProjectId};
use std::sync::Arc;

/// Key holding the serialized project collection
pub const PROJECTS_KEY: &str = "grantdesk_strategy_projects_v2";

/// Key holding the last active project id
pub const ACTIVE_PROJECT_KEY: &str = "grantdesk_active_session_id";

/// Encode a project collection exactly as it is persisted
///
/// Encoding is deterministic, so persisting an unchanged collection twice
/// writes byte-identical content.
pub fn encode_projects(projects: &[Project]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(projects)?)
}

/// Decode a persisted collection; malformed content yields `None`
#[must_use]
pub fn decode_projects(raw: &str) -> Option<Vec<Project>> {
    match serde_json::from_str(raw) {
        Ok(projects) => Some(projects),
        Err(e) => {
            tracing::warn!(error = %e, "cached project collection is malformed, ignoring it");
            None
        }
    }
}

/// Process-wide persisted project cache
#[derive(Debug, Clone)]
pub struct LocalCache {
    backend: Arc<dyn StorageBackend>,
}

impl LocalCache {
    /// Wrap a storage backend
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Underlying backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Load every cached project
    ///
    /// A missing key or malformed content yields an empty collection; only a
    /// failing backend is an error.
    pub async fn load_projects(&self) -> Result<Vec<Project>, StoreError> {
        let Some(raw) = self.backend.get(PROJECTS_KEY).await? else {
            return Ok(Vec::new());
        };
        Ok(decode_projects(&raw).unwrap_or_default())
    }

    /// Load the last active project id, if any
    pub async fn load_active_id(&self) -> Result<Option<ProjectId>, StoreError> {
        let raw = self.backend.get(ACTIVE_PROJECT_KEY).await?;
        Ok(raw
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(ProjectId::from))
    }

    /// Persist the whole collection
    pub async fn save_projects(&self, projects: &[Project]) -> Result<(), StoreError> {
        let encoded = encode_projects(projects)?;
        self.backend.set(PROJECTS_KEY, &encoded).await?;
        tracing::debug!(count = projects.len(), bytes = encoded.len(), "project cache persisted");
        Ok(())
    }

    /// Persist the last active project id
    pub async fn save_active_id(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.backend.set(ACTIVE_PROJECT_KEY, id.as_str()).await
    }
}
