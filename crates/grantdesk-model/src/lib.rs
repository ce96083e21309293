//! Grantdesk Model
//!
//! Records and pure derivations for the grant-strategy workspace:
//! - [`Grant`] and [`Project`] records in their persisted (camelCase JSON) shape
//! - [`GrantPatch`] / [`ProjectPatch`] partial updates with numeric coercion
//! - Project id derivation from a city name
//! - [`Totals`] and [`FundingSummary`] over a project's grants
//!
//! # Example
//!
//! ```rust
//! use grantdesk_model::{ApplicationStatus, Grant, Project, Totals};
//!
//! let project = Project::new("austin-ab12c", "Austin").with_grants(vec![
//!     Grant::new("grant-0-1", "Parks Fund")
//!         .with_range(0.0, 100_000.0)
//!         .with_status(ApplicationStatus::Awarded),
//! ]);
//!
//! let totals = Totals::of(Some(&project));
//! assert_eq!(totals.secured_from_grants, 100_000.0);
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod grant;
pub mod id;
pub mod lenient;
pub mod patch;
pub mod project;
pub mod totals;

pub use clock::{Clock, ManualClock, SystemClock};
pub use grant::{ApplicationStatus, FundingLevel, Grant, PLACEHOLDER_LINK};
pub use id::{slugify, GrantId, ProjectId, DEFAULT_SUFFIX_LEN};
pub use patch::{GrantPatch, NumericInput, ProjectPatch};
pub use project::{Project, Scale};
pub use totals::{funding_gap, percent_of, FundingSummary, Totals};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
