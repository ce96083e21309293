//! Derived funding figures
//!
//! Everything here is recomputed from the grant list on demand and never
//! persisted.

use crate::grant::Grant;
use crate::lenient::finite_or_zero;
use crate::project::Project;
use serde::Serialize;

/// Aggregates over a project's grants
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of every grant's maximum award
    pub potential: f64,
    /// Sum over awarded grants of the confirmed amount, else the maximum
    pub secured_from_grants: f64,
}

impl Totals {
    /// Totals for the active project; zero when there is none
    #[must_use]
    pub fn of(project: Option<&Project>) -> Self {
        project.map_or_else(Self::default, |p| Self::from_grants(&p.potential_grants))
    }

    /// Totals over an arbitrary grant slice
    #[must_use]
    pub fn from_grants<'a>(grants: impl IntoIterator<Item = &'a Grant>) -> Self {
        grants.into_iter().fold(Self::default(), |acc, grant| Self {
            potential: acc.potential + grant.potential_value(),
            secured_from_grants: acc.secured_from_grants + grant.secured_value(),
        })
    }
}

/// Figures shown in the funding summary bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
    /// Identified potential across all grants
    pub total_potential: f64,
    /// Project budget estimate
    pub estimated_need: f64,
    /// Outside funding plus grant awards
    pub secured: f64,
    /// Remaining need, never negative
    pub gap: f64,
    /// Secured share of the budget, capped at 100
    pub progress_percent: f64,
    /// Potential share of the budget, capped at 100
    pub potential_coverage_percent: f64,
}

impl FundingSummary {
    /// Derive the summary for a project from its totals
    #[must_use]
    pub fn new(project: &Project, totals: Totals) -> Self {
        let estimated_need = finite_or_zero(project.budget_estimate);
        let secured = finite_or_zero(project.funding_secured) + totals.secured_from_grants;
        Self {
            total_potential: totals.potential,
            estimated_need,
            secured,
            gap: funding_gap(estimated_need, secured),
            progress_percent: percent_of(secured, estimated_need),
            potential_coverage_percent: percent_of(totals.potential, estimated_need),
        }
    }

    /// Summary for a project, computing totals on the way
    #[must_use]
    pub fn for_project(project: &Project) -> Self {
        Self::new(project, Totals::of(Some(project)))
    }
}

/// `max(0, budget - secured)`
#[must_use]
pub fn funding_gap(budget_estimate: f64, secured: f64) -> f64 {
    finite_or_zero(budget_estimate - secured).max(0.0)
}

/// `min(100, part / whole * 100)`; a zero or non-finite whole yields 0
#[must_use]
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        return 0.0;
    }
    finite_or_zero(part / whole * 100.0).min(100.0)
}
