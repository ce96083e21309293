//! Workspace controller
//!
//! Reconciles the local cache, the deep-link fragment and the remote store
//! into one active project, and runs every user action against it:
//! - Two-phase startup (local tentative activation, then remote confirmation)
//! - Post-selection sync of the cache and the fragment after every change
//! - Project creation through the generation service
//! - Grant and project edits scoped to the active project
//! - Explicit push, health probing and access recovery
//!
//! State sits behind a short-lived lock that is never held across an await.
//! Remote failures are folded into [`ConnectivityStatus`] and banners; only
//! local cache failures and generation failures surface as errors.

use crate::config::WorkspaceConfig;
use crate::connectivity::ConnectivityStatus;
use crate::error::WorkspaceError;
use crate::location::{fragment_for, fragment_project_id, Location};
use crate::state::{Activation, Banner, PendingFetch, Stage, StartupPlan, WorkspaceState};
use grantdesk_generation::{Analysis, Discovery, GenerationError, Generator};
use grantdesk_model::{
    ApplicationStatus, Clock, FundingSummary, Grant, GrantId, GrantPatch, Project, ProjectId, ProjectPatch,
    SystemClock, Totals,
};
use grantdesk_remote::{RemoteError, RemoteStore};
use grantdesk_store::{LocalCache, StoreError};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

/// External collaborators of a workspace
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Persisted local cache
    pub cache: LocalCache,
    /// Shared document store
    pub remote: Arc<dyn RemoteStore>,
    /// Strategy generation service
    pub generator: Arc<dyn Generator>,
    /// Addressable location
    pub location: Arc<dyn Location>,
}

/// Point-in-time copy of the workspace for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    /// Every project, most recent first
    pub projects: Vec<Project>,
    /// Current selection
    pub activation: Activation,
    /// Message for the user
    pub banner: Option<Banner>,
    /// Remote store status
    pub connectivity: ConnectivityStatus,
    /// Step in progress
    pub stage: Stage,
}

impl WorkspaceSnapshot {
    /// Active project record
    #[must_use]
    pub fn active(&self) -> Option<&Project> {
        let id = self.activation.id()?;
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Totals over the active project; zero without one
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals::of(self.active())
    }

    /// Summary bar figures for the active project
    #[must_use]
    pub fn summary(&self) -> Option<FundingSummary> {
        self.active().map(FundingSummary::for_project)
    }
}

/// Publishes a stage for its lifetime and resets to idle on drop
struct BusyGuard<'a> {
    stage: &'a watch::Sender<Stage>,
}

impl BusyGuard<'_> {
    fn advance(&self, stage: Stage) {
        self.stage.send_replace(stage);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.stage.send_replace(Stage::Idle);
    }
}

/// The reconciliation controller
#[derive(Debug)]
pub struct Workspace {
    config: WorkspaceConfig,
    cache: LocalCache,
    remote: Arc<dyn RemoteStore>,
    generator: Arc<dyn Generator>,
    location: Arc<dyn Location>,
    clock: Arc<dyn Clock>,
    state: Mutex<WorkspaceState>,
    rng: Mutex<StdRng>,
    stage: watch::Sender<Stage>,
    /// Orders cache writes so the last writer persists the latest state
    persist: tokio::sync::Mutex<()>,
}

impl Workspace {
    /// Create a workspace using the system clock
    #[must_use]
    pub fn new(config: WorkspaceConfig, collaborators: Collaborators) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (stage, _) = watch::channel(Stage::Idle);
        Self {
            config,
            cache: collaborators.cache,
            remote: collaborators.remote,
            generator: collaborators.generator,
            location: collaborators.location,
            clock: Arc::new(SystemClock),
            state: Mutex::new(WorkspaceState::default()),
            rng: Mutex::new(rng),
            stage,
            persist: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    fn busy(&self, stage: Stage) -> BusyGuard<'_> {
        self.stage.send_replace(stage);
        BusyGuard { stage: &self.stage }
    }

    // ---------------------------------------------------------------
    // Startup
    // ---------------------------------------------------------------

    /// Resolve the active project from cache, fragment and remote store
    ///
    /// Never fails: unexpected local errors become a handshake banner. The
    /// busy stage is cleared however this returns.
    pub async fn startup(&self) -> Option<ProjectId> {
        let busy = self.busy(Stage::CheckingConnection);

        match self.begin_startup().await {
            Ok(StartupPlan::Resolved) => {}
            Ok(StartupPlan::Fetch(pending)) => {
                busy.advance(Stage::LocatingWorkspace);
                let fetched = self.remote.fetch_project(&pending.id).await;
                if let Err(e) = self.complete_startup(&pending, fetched).await {
                    self.handshake_failed(&e);
                }
            }
            Err(e) => self.handshake_failed(&e),
        }

        let active = self.active_id();
        tracing::info!(active = ?active.as_ref().map(ProjectId::as_str), "workspace startup resolved");
        active
    }

    /// First startup phase: load the cache and activate what is local
    ///
    /// A deep-linked project found locally is active, tentatively, as soon
    /// as this returns.
    pub async fn begin_startup(&self) -> Result<StartupPlan, WorkspaceError> {
        let cached = self.cache.load_projects().await?;
        let linked = self.location.fragment().as_deref().and_then(fragment_project_id);
        let last_active = match linked {
            Some(_) => None,
            None => self.cache.load_active_id().await?,
        };
        tracing::debug!(
            cached = cached.len(),
            linked = ?linked.as_ref().map(ProjectId::as_str),
            "startup loaded local state"
        );

        let plan = self.state.lock().begin_startup(cached, linked, last_active);
        self.sync_selection().await?;
        Ok(plan)
    }

    /// Second startup phase: apply the remote lookup for a deep link
    pub async fn complete_startup(
        &self,
        pending: &PendingFetch,
        fetched: Result<Option<Project>, RemoteError>,
    ) -> Result<(), WorkspaceError> {
        match &fetched {
            Ok(Some(_)) => tracing::info!(project = %pending.id, "remote copy supersedes local state"),
            Ok(None) => tracing::warn!(project = %pending.id, had_local = pending.had_local, "linked workspace missing remotely"),
            Err(e) => tracing::warn!(project = %pending.id, error = %e, "remote lookup failed"),
        }
        {
            let mut state = self.state.lock();
            state.connectivity.observe(&fetched);
            state.complete_startup(pending, fetched);
        }
        self.sync_selection().await?;
        Ok(())
    }

    fn handshake_failed(&self, error: &WorkspaceError) {
        tracing::error!(error = %error, "sync handshake failed");
        self.state.lock().banner = Some(Banner::Handshake {
            cause: error.to_string(),
        });
    }

    // ---------------------------------------------------------------
    // Post-selection sync
    // ---------------------------------------------------------------

    /// Persist the active pointer and the collection, and point the fragment
    /// at the active project
    ///
    /// Does nothing without an active project. The fragment is only written
    /// when it differs, so repeated calls leave history untouched and write
    /// identical cache content. Returns whether anything was persisted.
    pub async fn sync_selection(&self) -> Result<bool, StoreError> {
        let _order = self.persist.lock().await;
        let (id, projects) = {
            let state = self.state.lock();
            match state.active_id() {
                Some(id) => (id.clone(), state.projects.clone()),
                None => return Ok(false),
            }
        };

        self.cache.save_active_id(&id).await?;
        self.cache.save_projects(&projects).await?;

        let target = fragment_for(&id);
        if self.location.fragment().as_deref() != Some(target.as_str()) {
            self.location.replace_fragment(&target);
            tracing::debug!(fragment = %target, "location fragment replaced");
        }
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    /// Generate a project for a city, make it active and save it remotely
    ///
    /// The remote save is best effort: its failure only shows in
    /// connectivity status. Generation failures leave the collection and
    /// selection exactly as they were.
    pub async fn create_project(&self, city_name: &str) -> Result<ProjectId, WorkspaceError> {
        let city = city_name.trim();
        if city.is_empty() {
            self.state.lock().banner = Some(Banner::Validation {
                message: "Enter a city name".to_string(),
            });
            return Err(WorkspaceError::EmptyCityName);
        }
        self.state.lock().banner = None;

        let busy = self.busy(Stage::GeneratingStrategy);
        let (analysis, discovery) = match self.generate(city, &busy).await {
            Ok(generated) => generated,
            Err(e) => {
                tracing::warn!(city, error = %e, "strategy generation failed");
                self.state.lock().banner = Some(Banner::Generation { cause: e.to_string() });
                return Err(e.into());
            }
        };

        let now = self.clock.now_millis();
        let project = {
            let mut rng = self.rng.lock();
            let mut state = self.state.lock();
            let id = state.unused_id(city, &mut *rng, self.config.id_suffix_len);
            let mut project = Project::new(id, city);
            analysis.apply_to(&mut project, self.config.fallback_budget);
            project.potential_grants = discovery.into_grants(now);
            project.last_updated = now;
            project.is_processed = true;
            let inserted = state.insert_created(project.clone());
            debug_assert!(inserted, "derived id is unused while the state lock is held");
            project
        };
        let id = project.id.clone();
        tracing::info!(project = %id, grants = project.potential_grants.len(), "project created");

        let persisted = self.sync_selection().await;

        busy.advance(Stage::SyncingCloud);
        let saved = self.remote.save_project(&project).await;
        if let Err(e) = &saved {
            tracing::warn!(project = %id, error = %e, "initial remote save failed");
        }
        {
            let mut state = self.state.lock();
            state.connectivity.observe(&saved);
            state.self_created.remove(&id);
        }

        persisted?;
        Ok(id)
    }

    async fn generate(&self, city: &str, busy: &BusyGuard<'_>) -> Result<(Analysis, Discovery), GenerationError> {
        let analysis = self.generator.analyze(city, &self.config.generation_context).await?;
        busy.advance(Stage::DiscoveringGrants);
        let discovery = self.generator.discover_grants(city, &analysis).await?;
        Ok((analysis, discovery))
    }

    // ---------------------------------------------------------------
    // Edits
    // ---------------------------------------------------------------

    /// Apply `edit` to `project` if it is the active one, then sync
    async fn edit_active<T>(
        &self,
        project: &ProjectId,
        edit: impl FnOnce(&mut Project, i64) -> Option<T>,
    ) -> Result<Option<T>, WorkspaceError> {
        let now = self.clock.now_millis();
        let outcome = {
            let mut state = self.state.lock();
            match state.active_mut_if(project) {
                Some(record) => edit(record, now),
                None => {
                    tracing::debug!(project = %project, "ignoring edit for inactive project");
                    None
                }
            }
        };
        if outcome.is_some() {
            self.sync_selection().await?;
        }
        Ok(outcome)
    }

    /// Set a grant's status; any status may follow any other
    pub async fn update_grant_status(
        &self,
        project: &ProjectId,
        grant: &GrantId,
        status: ApplicationStatus,
    ) -> Result<bool, WorkspaceError> {
        let edited = self
            .edit_active(project, |record, now| record.set_grant_status(grant, status, now).then_some(()))
            .await?;
        Ok(edited.is_some())
    }

    /// Merge field edits into a grant
    pub async fn update_grant(
        &self,
        project: &ProjectId,
        grant: &GrantId,
        patch: &GrantPatch,
    ) -> Result<bool, WorkspaceError> {
        let edited = self
            .edit_active(project, |record, now| record.patch_grant(grant, patch, now).then_some(()))
            .await?;
        Ok(edited.is_some())
    }

    /// Remove a grant from the active project
    pub async fn remove_grant(&self, project: &ProjectId, grant: &GrantId) -> Result<Option<Grant>, WorkspaceError> {
        self.edit_active(project, |record, now| record.remove_grant(grant, now)).await
    }

    /// Merge edits into the active project's own fields
    pub async fn update_project(&self, project: &ProjectId, patch: &ProjectPatch) -> Result<bool, WorkspaceError> {
        let edited = self
            .edit_active(project, |record, now| {
                record.patch(patch, now);
                Some(())
            })
            .await?;
        Ok(edited.is_some())
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    /// Activate an existing project; returns whether it exists
    pub async fn select(&self, id: &ProjectId) -> Result<bool, WorkspaceError> {
        let selected = self.state.lock().select(id);
        if selected {
            self.sync_selection().await?;
        }
        Ok(selected)
    }

    /// Leave the current project to start a new one
    pub fn start_new(&self) {
        self.state.lock().start_new();
        self.location.clear_fragment();
        tracing::debug!("selection cleared");
    }

    // ---------------------------------------------------------------
    // Remote
    // ---------------------------------------------------------------

    /// Save the active project remotely; returns whether it was accepted
    pub async fn push_active(&self) -> bool {
        let Some(project) = self.active_project() else {
            return false;
        };
        let _busy = self.busy(Stage::Uploading);
        let outcome = self.remote.save_project(&project).await;

        let mut state = self.state.lock();
        state.connectivity.observe(&outcome);
        match outcome {
            Ok(()) => {
                tracing::info!(project = %project.id, "workspace pushed to cloud");
                state.banner = None;
                true
            }
            Err(e) => {
                tracing::warn!(project = %project.id, error = %e, "push failed");
                state.banner = Some(Banner::PushFailed { cause: e.to_string() });
                false
            }
        }
    }

    /// Probe the remote store; returns whether sync is usable
    pub async fn probe_health(&self) -> bool {
        let outcome = self.remote.probe_health().await;
        let mut state = self.state.lock();
        state.connectivity.observe(&outcome);
        if let Err(e) = &outcome {
            tracing::debug!(error = %e, "health probe failed");
        }
        state.connectivity.is_connected()
    }

    /// Clear the denial flag, then rerun startup and a probe
    pub async fn recover_access(&self) -> Option<ProjectId> {
        self.state.lock().connectivity.reset();
        tracing::info!("access recovery requested");
        let active = self.startup().await;
        self.probe_health().await;
        active
    }

    // ---------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let state = self.state.lock();
        WorkspaceSnapshot {
            projects: state.projects.clone(),
            activation: state.activation.clone(),
            banner: state.banner.clone(),
            connectivity: state.connectivity.clone(),
            stage: *self.stage.borrow(),
        }
    }

    /// Active project id
    #[must_use]
    pub fn active_id(&self) -> Option<ProjectId> {
        self.state.lock().active_id().cloned()
    }

    /// Active project record
    #[must_use]
    pub fn active_project(&self) -> Option<Project> {
        self.state.lock().active().cloned()
    }

    /// Totals over the active project
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals::of(self.state.lock().active())
    }

    /// Summary figures for the active project
    #[must_use]
    pub fn summary(&self) -> Option<FundingSummary> {
        self.state.lock().active().map(FundingSummary::for_project)
    }

    /// Current banner
    #[must_use]
    pub fn banner(&self) -> Option<Banner> {
        self.state.lock().banner.clone()
    }

    /// Remove the banner
    pub fn dismiss_banner(&self) {
        self.state.lock().banner = None;
    }

    /// Remote store status
    #[must_use]
    pub fn connectivity(&self) -> ConnectivityStatus {
        self.state.lock().connectivity.clone()
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    /// Follow stage changes
    #[must_use]
    pub fn subscribe_stage(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    /// Deep link to the active project under `base`
    pub fn share_link(&self, base: &str) -> Result<Option<String>, WorkspaceError> {
        let Some(id) = self.active_id() else {
            return Ok(None);
        };
        let mut url = Url::parse(base)?;
        url.set_fragment(Some(&fragment_for(&id)));
        Ok(Some(url.into()))
    }
}
