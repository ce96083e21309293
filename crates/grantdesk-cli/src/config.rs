//! Application configuration
//!
//! Read from `grantdesk.toml` (or `--config`), with API keys overridable
//! from the environment. A missing `[firestore]` section runs the workspace
//! local-only; a missing Gemini key only fails project creation.

use anyhow::Context;
use async_trait::async_trait;
use grantdesk_core::{Collaborators, Location, MemoryLocation, WorkspaceConfig};
use grantdesk_generation::{Analysis, Discovery, GeminiClient, GeminiConfig, GenerationError, Generator};
use grantdesk_remote::{DisconnectedRemote, FirestoreClient, FirestoreConfig, RemoteStore};
use grantdesk_store::{FileStorage, LocalCache};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Config file read when `--config` is not given
pub(crate) const DEFAULT_CONFIG_FILE: &str = "grantdesk.toml";

/// Overrides `[firestore].api_key`
pub(crate) const FIRESTORE_KEY_VAR: &str = "GRANTDESK_FIRESTORE_API_KEY";

/// Overrides `[gemini].api_key`
pub(crate) const GEMINI_KEY_VAR: &str = "GRANTDESK_GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    /// Directory of the local cache
    pub(crate) storage_dir: PathBuf,
    /// Base URL that share links are built on
    pub(crate) share_base_url: String,
    pub(crate) workspace: WorkspaceConfig,
    pub(crate) firestore: Option<FirestoreConfig>,
    pub(crate) gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".grantdesk"),
            share_base_url: "http://localhost:3000/".to_string(),
            workspace: WorkspaceConfig::default(),
            firestore: None,
            gemini: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default file when present
    ///
    /// An explicit path must exist; the default file is optional.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub(crate) fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply API keys from the environment
    #[must_use]
    pub(crate) fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply API keys from `lookup`; blank values are ignored
    #[must_use]
    pub(crate) fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = lookup(FIRESTORE_KEY_VAR) {
            match self.firestore.as_mut() {
                Some(firestore) => firestore.api_key = Some(key),
                None => tracing::warn!("{FIRESTORE_KEY_VAR} is set but no [firestore] section is configured"),
            }
        }
        if let Some(key) = lookup(GEMINI_KEY_VAR) {
            self.gemini.api_key = Some(key);
        }
        self
    }

    /// Remote store for this configuration
    pub(crate) fn remote(&self) -> anyhow::Result<Arc<dyn RemoteStore>> {
        match &self.firestore {
            Some(firestore) if !firestore.project_id.trim().is_empty() => {
                let client = FirestoreClient::new(firestore.clone()).context("configuring Firestore client")?;
                Ok(Arc::new(client))
            }
            _ => {
                tracing::info!("no remote store configured, running local-only");
                Ok(Arc::new(DisconnectedRemote))
            }
        }
    }

    /// Generation service for this configuration
    pub(crate) fn generator(&self) -> anyhow::Result<Arc<dyn Generator>> {
        if self.gemini.api_key.is_none() {
            return Ok(Arc::new(UnconfiguredGenerator));
        }
        let client = GeminiClient::new(self.gemini.clone()).context("configuring Gemini client")?;
        Ok(Arc::new(client))
    }

    /// Collaborators for a workspace opened at `link`
    pub(crate) fn collaborators(&self, link: Option<&str>) -> anyhow::Result<Collaborators> {
        let location: Arc<dyn Location> = Arc::new(match link.and_then(link_fragment) {
            Some(fragment) => MemoryLocation::with_fragment(&fragment),
            None => MemoryLocation::new(),
        });
        Ok(Collaborators {
            cache: LocalCache::new(Arc::new(FileStorage::new(&self.storage_dir))),
            remote: self.remote()?,
            generator: self.generator()?,
            location,
        })
    }
}

/// Fragment of a share link, a bare `#id=...` fragment or a bare id
pub(crate) fn link_fragment(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(link) {
        return url.fragment().filter(|f| !f.is_empty()).map(str::to_string);
    }
    let fragment = link.strip_prefix('#').unwrap_or(link);
    if fragment.contains('=') {
        Some(fragment.to_string())
    } else {
        Some(format!("id={fragment}"))
    }
}

/// Stands in for the generation service when no API key is configured
#[derive(Debug)]
struct UnconfiguredGenerator;

impl UnconfiguredGenerator {
    fn error() -> GenerationError {
        GenerationError::InvalidConfig(format!("set {GEMINI_KEY_VAR} or [gemini].api_key to generate strategies"))
    }
}

#[async_trait]
impl Generator for UnconfiguredGenerator {
    async fn analyze(&self, _city_name: &str, _context: &str) -> Result<Analysis, GenerationError> {
        Err(Self::error())
    }

    async fn discover_grants(&self, _city_name: &str, _analysis: &Analysis) -> Result<Discovery, GenerationError> {
        Err(Self::error())
    }
}
