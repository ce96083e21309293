//! Grantdesk Store
//!
//! Persisted local cache for project records:
//! - [`StorageBackend`]: string key-value storage ([`FileStorage`], [`MemoryStorage`])
//! - [`LocalCache`]: the project collection plus the last active project id
//!
//! Reads never fail on malformed content; a corrupt cache degrades to an
//! empty collection.
//!
//! # Example
//!
//! ```rust,ignore
//! use grantdesk_store::{FileStorage, LocalCache};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), grantdesk_store::StoreError> {
//! let cache = LocalCache::new(Arc::new(FileStorage::new(".grantdesk")));
//! let projects = cache.load_projects().await?;
//! cache.save_projects(&projects).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod cache;
pub mod error;

pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use cache::{decode_projects, encode_projects, LocalCache, ACTIVE_PROJECT_KEY, PROJECTS_KEY};
pub use error::StoreError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
