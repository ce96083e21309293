//! Grantdesk Remote
//!
//! Shared document store for project records:
//! - [`RemoteStore`] trait consumed by the workspace controller
//! - [`FirestoreClient`], a Firestore REST implementation
//! - [`DisconnectedRemote`] for hosts with no store configured
//! - [`RemoteError`] with denied / not-found / transport classification

#![warn(unreachable_pub)]

pub mod error;
pub mod firestore;
pub mod store;

pub use error::RemoteError;
pub use firestore::{FirestoreClient, FirestoreConfig};
pub use store::{DisconnectedRemote, RemoteStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
