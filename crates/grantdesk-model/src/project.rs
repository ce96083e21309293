//! Project records
//!
//! One city's funding strategy and its ordered list of grants. Grant order is
//! the generation order and survives every edit.

use crate::grant::{ApplicationStatus, Grant};
use crate::id::{GrantId, ProjectId};
use crate::lenient;
use crate::patch::{GrantPatch, ProjectPatch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Footprint of the planned installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Scale {
    /// One location
    SingleSite,
    /// A handful of locations
    MultiSite,
    /// Spread across the whole city
    #[default]
    Citywide,
}

impl Scale {
    /// Wire label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SingleSite => "Single Site",
            Self::MultiSite => "Multi-Site",
            Self::Citywide => "Citywide",
        }
    }
}

impl From<String> for Scale {
    fn from(value: String) -> Self {
        let normalized: String = value
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "singlesite" => Self::SingleSite,
            "multisite" => Self::MultiSite,
            _ => Self::Citywide,
        }
    }
}

impl From<Scale> for &'static str {
    fn from(value: Scale) -> Self {
        value.label()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One city's funding strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Immutable id; cache key, remote document name and deep-link token
    pub id: ProjectId,
    /// City name (editable)
    #[serde(default, deserialize_with = "lenient::string")]
    pub city_name: String,
    /// Strategic priorities in generation order
    #[serde(default, deserialize_with = "lenient::sequence")]
    pub priorities: Vec<String>,
    /// Installation footprint
    #[serde(default, deserialize_with = "lenient::label")]
    pub scale: Scale,
    /// Equity goals
    #[serde(default, deserialize_with = "lenient::string")]
    pub equity_goals: String,
    /// Estimated total budget
    #[serde(default, deserialize_with = "lenient::number")]
    pub budget_estimate: f64,
    /// Funding already committed outside the tracked grants
    #[serde(default, deserialize_with = "lenient::number")]
    pub funding_secured: f64,
    /// Candidate grants
    #[serde(default, deserialize_with = "lenient::sequence")]
    pub potential_grants: Vec<Grant>,
    /// Optional phasing notes from analysis
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub phase_breakdown: Option<String>,
    /// Epoch milliseconds of the last mutation
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub last_updated: i64,
    /// Generation completed for this record
    #[serde(default)]
    pub is_processed: bool,
}

impl Project {
    /// Create an empty project
    #[must_use]
    pub fn new(id: impl Into<ProjectId>, city_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            city_name: city_name.into(),
            priorities: Vec::new(),
            scale: Scale::default(),
            equity_goals: String::new(),
            budget_estimate: 0.0,
            funding_secured: 0.0,
            potential_grants: Vec::new(),
            phase_breakdown: None,
            last_updated: 0,
            is_processed: false,
        }
    }

    /// With grants
    #[inline]
    #[must_use]
    pub fn with_grants(mut self, grants: Vec<Grant>) -> Self {
        self.potential_grants = grants;
        self
    }

    /// With budget estimate
    #[inline]
    #[must_use]
    pub fn with_budget(mut self, budget_estimate: f64) -> Self {
        self.budget_estimate = budget_estimate;
        self
    }

    /// Look up a grant
    #[must_use]
    pub fn grant(&self, id: &GrantId) -> Option<&Grant> {
        self.potential_grants.iter().find(|g| &g.id == id)
    }

    fn grant_mut(&mut self, id: &GrantId) -> Option<&mut Grant> {
        self.potential_grants.iter_mut().find(|g| &g.id == id)
    }

    /// Record a mutation at `now_ms`
    #[inline]
    pub fn touch(&mut self, now_ms: i64) {
        self.last_updated = now_ms;
    }

    /// Replace a grant's status; returns whether the grant exists
    pub fn set_grant_status(&mut self, id: &GrantId, status: ApplicationStatus, now_ms: i64) -> bool {
        let Some(grant) = self.grant_mut(id) else {
            return false;
        };
        grant.status = status;
        self.touch(now_ms);
        true
    }

    /// Merge a patch into a grant in place; returns whether the grant exists
    pub fn patch_grant(&mut self, id: &GrantId, patch: &GrantPatch, now_ms: i64) -> bool {
        let Some(grant) = self.grant_mut(id) else {
            return false;
        };
        patch.apply_to(grant);
        self.touch(now_ms);
        true
    }

    /// Remove a grant; returns the removed record
    pub fn remove_grant(&mut self, id: &GrantId, now_ms: i64) -> Option<Grant> {
        let index = self.potential_grants.iter().position(|g| &g.id == id)?;
        let removed = self.potential_grants.remove(index);
        self.touch(now_ms);
        Some(removed)
    }

    /// Merge a patch into the project's own attributes
    pub fn patch(&mut self, patch: &ProjectPatch, now_ms: i64) {
        patch.apply_to(self);
        self.touch(now_ms);
    }
}
