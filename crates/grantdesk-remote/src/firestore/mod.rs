//! Firestore REST client
//!
//! Talks to the `documents` endpoint of the Firestore v1 REST API with an
//! API key, the same access an unauthenticated web client has.

pub mod document;

use crate::error::RemoteError;
use crate::store::RemoteStore;
use async_trait::async_trait;
use grantdesk_model::{Clock, Project, ProjectId, SystemClock};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Public Firestore endpoint
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

/// Firestore connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// Endpoint root; overridden in tests and for the emulator
    pub base_url: String,
    /// Cloud project hosting the database
    pub project_id: String,
    /// Database name
    pub database: String,
    /// Web API key appended as `?key=`
    pub api_key: Option<String>,
    /// Collection holding project documents
    pub collection: String,
    /// Path of the document read by the health probe
    pub health_document: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: String::new(),
            database: "(default)".to_string(),
            api_key: None,
            collection: "projects".to_string(),
            health_document: "system/health".to_string(),
            timeout_secs: 15,
        }
    }
}

impl FirestoreConfig {
    /// Settings for a cloud project
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Set endpoint root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set per-request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// [`RemoteStore`] backed by Firestore
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    config: FirestoreConfig,
    documents_root: Url,
    clock: Arc<dyn Clock>,
}

impl FirestoreClient {
    /// Build a client stamping saves with the system clock
    pub fn new(config: FirestoreConfig) -> Result<Self, RemoteError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a client with an explicit clock
    pub fn with_clock(config: FirestoreConfig, clock: Arc<dyn Clock>) -> Result<Self, RemoteError> {
        if config.project_id.trim().is_empty() {
            return Err(RemoteError::Transport("firestore project id is empty".into()));
        }
        let mut documents_root = Url::parse(&config.base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid firestore url {}: {e}", config.base_url)))?;
        documents_root
            .path_segments_mut()
            .map_err(|()| RemoteError::Transport(format!("firestore url cannot be a base: {}", config.base_url)))?
            .pop_if_empty()
            .extend(["v1", "projects", config.project_id.as_str(), "databases", config.database.as_str(), "documents"]);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            documents_root,
            clock,
        })
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// URL of a document given its slash-separated path under `documents`
    #[must_use]
    pub fn document_url(&self, document_path: &str) -> Url {
        let mut url = self.documents_root.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(document_path.split('/').filter(|s| !s.is_empty()));
        }
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    fn project_url(&self, id: &ProjectId) -> Url {
        let mut url = self.documents_root.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&self.config.collection).push(id.as_str());
        }
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    /// GET a document; `Ok(None)` on 404
    async fn get_document(&self, url: Url) -> Result<Option<serde_json::Value>, RemoteError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        Ok(Some(body))
    }
}

async fn error_from_response(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => match envelope.error.status {
            Some(kind) => format!("{kind}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => text,
    };
    RemoteError::from_status(status, message)
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn fetch_project(&self, id: &ProjectId) -> Result<Option<Project>, RemoteError> {
        if id.is_empty() {
            return Ok(None);
        }
        let Some(body) = self.get_document(self.project_url(id)).await? else {
            tracing::debug!(project = %id, "no remote document");
            return Ok(None);
        };
        let project = document::decode_project_at(&body, id)?;
        tracing::debug!(project = %id, grants = project.potential_grants.len(), "remote document fetched");
        Ok(Some(project))
    }

    async fn save_project(&self, project: &Project) -> Result<(), RemoteError> {
        if project.id.is_empty() {
            return Err(RemoteError::Malformed("project has no id".into()));
        }
        let mut stamped = project.clone();
        stamped.touch(self.clock.now_millis());
        let body = document::encode_project(&stamped)?;

        let response = self.http.patch(self.project_url(&project.id)).json(&body).send().await?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            tracing::warn!(project = %project.id, error = %err, "remote save rejected");
            return Err(err);
        }
        tracing::info!(project = %project.id, "project saved to remote store");
        Ok(())
    }

    async fn probe_health(&self) -> Result<(), RemoteError> {
        let url = self.document_url(&self.config.health_document);
        self.get_document(url).await.map(|_| ())
    }
}
