//! Grantdesk Generation
//!
//! Drafts a project's content from a city name in two stages:
//! - [`Generator::analyze`] produces an [`Analysis`] (priorities, budget, scale)
//! - [`Generator::discover_grants`] produces a [`Discovery`] of candidate grants
//!
//! [`GeminiClient`] implements the contract over the Gemini REST API.
//!
//! # Example
//!
//! ```rust
//! use grantdesk_generation::{Discovery, GrantCandidate};
//!
//! let discovery = Discovery {
//!     candidates: vec![GrantCandidate::new("Parks Fund", 100_000.0)],
//!     grounding_urls: vec!["https://parks.example.org".into()],
//! };
//! let grants = discovery.into_grants(1_700_000_000_000);
//! assert_eq!(grants[0].id.as_str(), "grant-0-1700000000000");
//! assert_eq!(grants[0].source_link, "https://parks.example.org");
//! ```

#![warn(unreachable_pub)]

pub mod contract;
pub mod error;
pub mod gemini;

pub use contract::{Analysis, Discovery, GrantCandidate, Generator};
pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
