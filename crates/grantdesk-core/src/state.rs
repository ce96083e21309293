//! Workspace state and its transitions
//!
//! Everything the controller knows lives in one [`WorkspaceState`] value.
//! Transitions are synchronous methods so they can run under a short lock
//! and be tested without any collaborator.

use crate::connectivity::ConnectivityStatus;
use grantdesk_model::{Project, ProjectId};
use grantdesk_remote::RemoteError;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Draws per suffix length before the suffix grows by one character
const ID_ATTEMPTS: usize = 64;

/// Which project is active and how sure we are about it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Activation {
    /// Nothing selected
    #[default]
    None,
    /// Selected from the local cache while a remote fetch is outstanding
    Tentative(ProjectId),
    /// Selected and settled
    Confirmed(ProjectId),
}

impl Activation {
    /// Selected id, tentative or not
    #[must_use]
    pub fn id(&self) -> Option<&ProjectId> {
        match self {
            Self::None => None,
            Self::Tentative(id) | Self::Confirmed(id) => Some(id),
        }
    }

    /// Whether the selection still waits on the network
    #[inline]
    #[must_use]
    pub fn is_tentative(&self) -> bool {
        matches!(self, Self::Tentative(_))
    }
}

/// User-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Banner {
    /// Input rejected before anything ran
    Validation {
        /// What is wrong with the input
        message: String,
    },
    /// Strategy generation failed; nothing was committed
    Generation {
        /// Underlying failure
        cause: String,
    },
    /// Deep-linked workspace exists only in the local cache
    OrphanedWorkspace {
        /// Linked id
        id: ProjectId,
    },
    /// Deep-linked workspace exists nowhere
    WorkspaceNotFound {
        /// Linked id
        id: ProjectId,
    },
    /// The remote store could not be reached while resolving a link
    RemoteUnavailable {
        /// Underlying failure
        cause: String,
    },
    /// Explicit push was not accepted
    PushFailed {
        /// Underlying failure
        cause: String,
    },
    /// Startup could not read local state
    Handshake {
        /// Underlying failure
        cause: String,
    },
}

impl Banner {
    /// Whether retrying the triggering action is the suggested remedy
    #[must_use]
    pub fn is_retry_oriented(&self) -> bool {
        !matches!(self, Self::Validation { .. })
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message } => f.write_str(message),
            Self::Generation { .. } => f.write_str("Strategy generation failed. Please retry."),
            Self::OrphanedWorkspace { id } => write!(
                f,
                "Workspace \"{id}\" exists in local cache but not in the cloud database. Push it to the cloud to initialize it."
            ),
            Self::WorkspaceNotFound { id } => {
                write!(f, "Workspace \"{id}\" was not found locally or in the cloud database.")
            }
            Self::RemoteUnavailable { cause } => write!(f, "Cloud database unavailable: {cause}"),
            Self::PushFailed { cause } => write!(f, "Push failed: {cause}"),
            Self::Handshake { .. } => f.write_str("Sync handshake error."),
        }
    }
}

/// Long-running step currently in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    /// Nothing outstanding
    #[default]
    Idle,
    /// Reading the local cache during startup
    CheckingConnection,
    /// Fetching a deep-linked workspace
    LocatingWorkspace,
    /// Analysis stage of creation
    GeneratingStrategy,
    /// Discovery stage of creation
    DiscoveringGrants,
    /// First remote save of a new project
    SyncingCloud,
    /// Explicit push of the active project
    Uploading,
}

impl Stage {
    /// Progress text
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::CheckingConnection => "Checking cloud connection...",
            Self::LocatingWorkspace => "Locating workspace...",
            Self::GeneratingStrategy => "Generating strategy...",
            Self::DiscoveringGrants => "Discovering grants...",
            Self::SyncingCloud => "Syncing cloud instance...",
            Self::Uploading => "Uploading to cloud...",
        }
    }

    /// Whether something is outstanding
    #[inline]
    #[must_use]
    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

/// Remote fetch the startup pass still owes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    /// Deep-linked id
    pub id: ProjectId,
    /// Whether the local cache had a copy at the time of the lookup
    pub had_local: bool,
}

/// First phase outcome of startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupPlan {
    /// Nothing left to do
    Resolved,
    /// A deep link needs a remote lookup
    Fetch(PendingFetch),
}

/// All controller state
#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    /// Project collection, most recent first
    pub projects: Vec<Project>,
    /// Current selection
    pub activation: Activation,
    /// Message shown to the user
    pub banner: Option<Banner>,
    /// Remote store status
    pub connectivity: ConnectivityStatus,
    /// Ids created by this process whose first remote save is outstanding
    pub self_created: HashSet<ProjectId>,
}

impl WorkspaceState {
    /// Look up a project
    #[must_use]
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Look up a project for mutation
    pub fn project_mut(&mut self, id: &ProjectId) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| &p.id == id)
    }

    /// Whether a project is in the collection
    #[must_use]
    pub fn contains(&self, id: &ProjectId) -> bool {
        self.project(id).is_some()
    }

    /// Active id, only when the record exists
    #[must_use]
    pub fn active_id(&self) -> Option<&ProjectId> {
        self.activation.id().filter(|id| self.contains(id))
    }

    /// Active project record
    #[must_use]
    pub fn active(&self) -> Option<&Project> {
        self.activation.id().and_then(|id| self.project(id))
    }

    /// Active project for mutation, only if `id` is the active one
    pub fn active_mut_if(&mut self, id: &ProjectId) -> Option<&mut Project> {
        if self.activation.id() != Some(id) {
            return None;
        }
        self.project_mut(id)
    }

    /// Load the cached collection and resolve what can be resolved locally
    ///
    /// A deep-linked id found in the cache becomes tentatively active at
    /// once; the returned plan says whether a remote lookup must follow.
    /// Without a deep link the last active project is restored.
    pub fn begin_startup(
        &mut self,
        cached: Vec<Project>,
        linked: Option<ProjectId>,
        last_active: Option<ProjectId>,
    ) -> StartupPlan {
        self.projects = cached;
        self.banner = None;
        self.activation = Activation::None;

        if let Some(id) = linked {
            let had_local = self.contains(&id);
            if had_local {
                self.activation = Activation::Tentative(id.clone());
            }
            return StartupPlan::Fetch(PendingFetch { id, had_local });
        }

        if let Some(id) = last_active.filter(|id| self.contains(id)) {
            self.activation = Activation::Confirmed(id);
        }
        StartupPlan::Resolved
    }

    /// Settle a deep link with the remote lookup's outcome
    ///
    /// A fetched record is filed under the linked id, replaces any local copy
    /// wholesale and moves to the front. Otherwise the local copy, if any, is confirmed and a banner is
    /// raised unless this process created the id itself.
    pub fn complete_startup(&mut self, pending: &PendingFetch, fetched: Result<Option<Project>, RemoteError>) {
        let id = &pending.id;
        match fetched {
            Ok(Some(mut remote)) => {
                remote.id = id.clone();
                self.projects.retain(|p| &p.id != id);
                self.projects.insert(0, remote);
                self.activation = Activation::Confirmed(id.clone());
                self.banner = None;
            }
            Ok(None) | Err(RemoteError::NotFound(_)) => {
                self.confirm_local(id);
                if !self.self_created.contains(id) {
                    self.banner = Some(if self.contains(id) {
                        Banner::OrphanedWorkspace { id: id.clone() }
                    } else {
                        Banner::WorkspaceNotFound { id: id.clone() }
                    });
                }
            }
            Err(error) => {
                self.confirm_local(id);
                // denials surface through connectivity instead
                if !error.is_denied() && !self.self_created.contains(id) {
                    self.banner = Some(Banner::RemoteUnavailable {
                        cause: error.to_string(),
                    });
                }
            }
        }
    }

    fn confirm_local(&mut self, id: &ProjectId) {
        if self.activation == Activation::Tentative(id.clone()) {
            self.activation = if self.contains(id) {
                Activation::Confirmed(id.clone())
            } else {
                Activation::None
            };
        }
    }

    /// Derive an id for `city` that no held project uses
    ///
    /// Every [`ID_ATTEMPTS`] draws that only hit taken ids lengthen the
    /// suffix by one character.
    pub fn unused_id<R: Rng + ?Sized>(&self, city: &str, rng: &mut R, suffix_len: usize) -> ProjectId {
        let mut len = suffix_len.max(1);
        loop {
            for _ in 0..ID_ATTEMPTS {
                let id = ProjectId::derive(city, rng, len);
                if !self.contains(&id) {
                    return id;
                }
            }
            len += 1;
        }
    }

    /// Insert a freshly created project at the front and activate it
    ///
    /// Returns `false` and leaves the state untouched when the id is
    /// already held.
    pub fn insert_created(&mut self, project: Project) -> bool {
        let id = project.id.clone();
        if self.contains(&id) {
            return false;
        }
        self.self_created.insert(id.clone());
        self.projects.insert(0, project);
        self.activation = Activation::Confirmed(id);
        true
    }

    /// Activate an existing project; returns whether it exists
    pub fn select(&mut self, id: &ProjectId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.activation = Activation::Confirmed(id.clone());
        true
    }

    /// Deselect everything and drop the banner
    pub fn start_new(&mut self) {
        self.activation = Activation::None;
        self.banner = None;
    }
}
