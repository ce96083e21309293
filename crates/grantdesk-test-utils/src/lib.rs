//! Testing utilities for the grantdesk workspace
//!
//! Fixtures, scripted collaborators and a ready-wired workspace harness.

#![allow(missing_docs)]

mod scripted;

pub use scripted::{ScriptedGenerator, ScriptedRemote};

use grantdesk_core::{Collaborators, MemoryLocation, Workspace, WorkspaceConfig};
use grantdesk_generation::{Analysis, Discovery, GrantCandidate};
use grantdesk_model::{ApplicationStatus, Grant, ManualClock, Project};
use grantdesk_store::{encode_projects, LocalCache, MemoryStorage, ACTIVE_PROJECT_KEY, PROJECTS_KEY};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Fixed clock reading used by [`TestWorkspace`]
pub const TEST_NOW: i64 = 1_700_000_000_000;

/// Project with two grants and a budget
pub fn sample_project(id: &str, city: &str) -> Project {
    let mut project = Project::new(id, city).with_budget(250_000.0).with_grants(vec![
        Grant::new("grant-0-1700000000000", "Community Foundation Fund").with_range(5_000.0, 50_000.0),
        Grant::new("grant-1-1700000000000", "Land and Water Conservation Fund").with_range(0.0, 200_000.0),
    ]);
    project.priorities = vec!["Health equity".to_string()];
    project.last_updated = TEST_NOW - 60_000;
    project.is_processed = true;
    project
}

/// Grant already awarded, optionally with a confirmed amount
pub fn awarded_grant(id: &str, max_val: f64, confirmed: Option<f64>) -> Grant {
    let mut grant = Grant::new(id, "Awarded Fund")
        .with_range(0.0, max_val)
        .with_status(ApplicationStatus::Awarded);
    grant.confirmed_award_amount = confirmed;
    grant
}

/// Analysis with priorities and no budget
pub fn sample_analysis() -> Analysis {
    Analysis {
        priorities: vec!["Health equity".into(), "Park access".into()],
        scale: Some("Citywide".into()),
        equity_goals: Some("Serve underinvested neighborhoods".into()),
        ..Analysis::default()
    }
}

/// Discovery with `count` candidates and one grounding source
pub fn sample_discovery(count: usize) -> Discovery {
    Discovery {
        candidates: (0..count)
            .map(|i| GrantCandidate::new(format!("Fund {i}"), 10_000.0 * (i as f64 + 1.0)))
            .collect(),
        grounding_urls: vec!["https://grants.example.gov/search".to_string()],
    }
}

/// Poll `condition` until it holds; panics after two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Run `future` with a two-second ceiling
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("operation did not finish in time")
}

/// Workspace wired to in-memory collaborators
#[derive(Debug, Clone)]
pub struct TestWorkspace {
    pub workspace: Arc<Workspace>,
    pub storage: Arc<MemoryStorage>,
    pub location: Arc<MemoryLocation>,
    pub remote: Arc<ScriptedRemote>,
    pub generator: Arc<ScriptedGenerator>,
    pub clock: Arc<ManualClock>,
}

/// Builder for [`TestWorkspace`]
#[derive(Debug, Default)]
pub struct TestWorkspaceBuilder {
    cached: Vec<Project>,
    last_active: Option<String>,
    fragment: Option<String>,
    remote: Option<ScriptedRemote>,
    generator: Option<ScriptedGenerator>,
    config: Option<WorkspaceConfig>,
}

impl TestWorkspaceBuilder {
    pub fn cached(mut self, projects: Vec<Project>) -> Self {
        self.cached = projects;
        self
    }

    pub fn last_active(mut self, id: &str) -> Self {
        self.last_active = Some(id.to_string());
        self
    }

    pub fn fragment(mut self, fragment: &str) -> Self {
        self.fragment = Some(fragment.to_string());
        self
    }

    pub fn remote(mut self, remote: ScriptedRemote) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn config(mut self, config: WorkspaceConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> TestWorkspace {
        let storage = Arc::new(MemoryStorage::new());
        if !self.cached.is_empty() {
            storage.insert_raw(PROJECTS_KEY, encode_projects(&self.cached).expect("fixture projects encode"));
        }
        if let Some(id) = self.last_active {
            storage.insert_raw(ACTIVE_PROJECT_KEY, id);
        }
        let location = Arc::new(match self.fragment {
            Some(fragment) => MemoryLocation::with_fragment(&fragment),
            None => MemoryLocation::new(),
        });
        let remote = Arc::new(self.remote.unwrap_or_default());
        let generator = Arc::new(self.generator.unwrap_or_default());
        let clock = Arc::new(ManualClock::new(TEST_NOW));
        let config = self.config.unwrap_or_else(|| WorkspaceConfig::default().with_rng_seed(7));

        let workspace = Workspace::new(
            config,
            Collaborators {
                cache: LocalCache::new(storage.clone()),
                remote: remote.clone(),
                generator: generator.clone(),
                location: location.clone(),
            },
        )
        .with_clock(clock.clone());

        TestWorkspace {
            workspace: Arc::new(workspace),
            storage,
            location,
            remote,
            generator,
            clock,
        }
    }
}

impl TestWorkspace {
    pub fn builder() -> TestWorkspaceBuilder {
        TestWorkspaceBuilder::default()
    }

    /// Projects as currently persisted in the cache
    pub fn persisted_projects(&self) -> Vec<Project> {
        self.storage
            .raw(PROJECTS_KEY)
            .and_then(|raw| grantdesk_store::decode_projects(&raw))
            .unwrap_or_default()
    }

    /// Raw cache content
    pub fn persisted_raw(&self) -> Option<String> {
        self.storage.raw(PROJECTS_KEY)
    }

    /// Persisted last-active pointer
    pub fn persisted_active_id(&self) -> Option<String> {
        self.storage.raw(ACTIVE_PROJECT_KEY)
    }
}
