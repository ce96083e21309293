//! Scripted collaborators
//!
//! In-memory stand-ins for the remote store and the generation service whose
//! answers, failures and timing are set by the test.

use async_trait::async_trait;
use grantdesk_generation::{Analysis, Discovery, GenerationError, Generator};
use grantdesk_model::{Project, ProjectId};
use grantdesk_remote::{RemoteError, RemoteStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Remote store backed by a map
///
/// Fetches and saves can be held behind a gate until the test releases them,
/// which makes interleavings with other operations deterministic.
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    documents: Mutex<HashMap<ProjectId, Project>>,
    fetch_failure: Mutex<Option<RemoteError>>,
    save_failure: Mutex<Option<RemoteError>>,
    probe_failure: Mutex<Option<RemoteError>>,
    fetch_gate: Mutex<Option<Arc<Notify>>>,
    save_gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
    saves: AtomicUsize,
    probes: AtomicUsize,
    saved: Mutex<Vec<Project>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document as if another client had written it
    pub fn with_document(self, project: Project) -> Self {
        self.documents.lock().insert(project.id.clone(), project);
        self
    }

    pub fn fail_fetches(&self, error: RemoteError) {
        *self.fetch_failure.lock() = Some(error);
    }

    pub fn fail_saves(&self, error: RemoteError) {
        *self.save_failure.lock() = Some(error);
    }

    pub fn fail_probes(&self, error: RemoteError) {
        *self.probe_failure.lock() = Some(error);
    }

    /// Clear every scripted failure
    pub fn heal(&self) {
        *self.fetch_failure.lock() = None;
        *self.save_failure.lock() = None;
        *self.probe_failure.lock() = None;
    }

    /// Hold fetches until the returned gate is notified
    pub fn gate_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.fetch_gate.lock() = Some(gate.clone());
        gate
    }

    /// Hold saves until the returned gate is notified
    pub fn gate_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.save_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Every record a save was attempted with, in call order
    pub fn saved(&self) -> Vec<Project> {
        self.saved.lock().clone()
    }

    pub fn document(&self, id: &str) -> Option<Project> {
        self.documents.lock().get(&ProjectId::from(id)).cloned()
    }
}

async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn fetch_project(&self, id: &ProjectId) -> Result<Option<Project>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        pass(&self.fetch_gate).await;
        if let Some(error) = self.fetch_failure.lock().clone() {
            return Err(error);
        }
        Ok(self.documents.lock().get(id).cloned())
    }

    async fn save_project(&self, project: &Project) -> Result<(), RemoteError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.saved.lock().push(project.clone());
        pass(&self.save_gate).await;
        if let Some(error) = self.save_failure.lock().clone() {
            return Err(error);
        }
        self.documents.lock().insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn probe_health(&self) -> Result<(), RemoteError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.probe_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Generator returning fixed output
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    analysis: Analysis,
    discovery: Discovery,
    failure: Mutex<Option<GenerationError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(analysis: Analysis, discovery: Discovery) -> Self {
        Self {
            analysis,
            discovery,
            ..Self::default()
        }
    }

    /// Fail every call with `error`
    pub fn failing(error: GenerationError) -> Self {
        let generator = Self::default();
        *generator.failure.lock() = Some(error);
        generator
    }

    /// Cities passed to `analyze`, in call order
    pub fn analyzed_cities(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn analyze(&self, city_name: &str, _context: &str) -> Result<Analysis, GenerationError> {
        self.calls.lock().push(city_name.to_string());
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(self.analysis.clone()),
        }
    }

    async fn discover_grants(&self, _city_name: &str, _analysis: &Analysis) -> Result<Discovery, GenerationError> {
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(self.discovery.clone()),
        }
    }
}
