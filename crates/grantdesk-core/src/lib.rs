//! Grantdesk Core
//!
//! The reconciliation controller of the grant-strategy workspace:
//! - [`Workspace`] resolves the active project from the local cache, the
//!   deep-link fragment and the remote store, and runs every user action
//! - [`WorkspaceState`] holds the selection, banner and connectivity as one
//!   value with synchronous transitions
//! - [`HealthMonitor`] probes the remote store in the background
//! - [`Location`] abstracts the addressable fragment (`#id=<project-id>`)
//!
//! # Example
//!
//! ```rust,no_run
//! use grantdesk_core::{Collaborators, MemoryLocation, Workspace, WorkspaceConfig};
//! use grantdesk_generation::{GeminiClient, GeminiConfig};
//! use grantdesk_remote::DisconnectedRemote;
//! use grantdesk_store::{FileStorage, LocalCache};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let workspace = Workspace::new(
//!     WorkspaceConfig::default(),
//!     Collaborators {
//!         cache: LocalCache::new(Arc::new(FileStorage::new(".grantdesk"))),
//!         remote: Arc::new(DisconnectedRemote),
//!         generator: Arc::new(GeminiClient::new(GeminiConfig::new("api-key"))?),
//!         location: Arc::new(MemoryLocation::with_fragment("#id=austin-ab12c")),
//!     },
//! );
//!
//! workspace.startup().await;
//! let id = workspace.create_project("Austin").await?;
//! println!("created {id}: {:?}", workspace.summary());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;
pub mod health;
pub mod location;
pub mod state;

pub use config::WorkspaceConfig;
pub use connectivity::ConnectivityStatus;
pub use controller::{Collaborators, Workspace, WorkspaceSnapshot};
pub use error::WorkspaceError;
pub use health::HealthMonitor;
pub use location::{fragment_for, fragment_project_id, Location, MemoryLocation};
pub use state::{Activation, Banner, PendingFetch, Stage, StartupPlan, WorkspaceState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
