//! Partial updates
//!
//! Patches carry only the fields the user touched. Matched fields replace the
//! stored value, everything else is retained. Numeric fields arrive as raw
//! form input and are coerced at merge time.

use crate::grant::{ApplicationStatus, FundingLevel, Grant};
use crate::lenient::parse_number;
use crate::project::{Project, Scale};
use serde::{Deserialize, Serialize};

/// Raw numeric input from an edit form or a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    /// Already a number
    Number(f64),
    /// Text to be parsed
    Text(String),
    /// Explicitly cleared
    Unset,
}

impl NumericInput {
    /// Coerce to a number; unparsable input becomes `0.0`
    #[must_use]
    pub fn coerce(&self) -> f64 {
        self.parsed().unwrap_or(0.0)
    }

    /// Coerce to an optional amount
    ///
    /// Empty, unparsable and zero input all mean "not set", so a blank form
    /// field never turns into a zero award.
    #[must_use]
    pub fn coerce_optional(&self) -> Option<f64> {
        self.parsed().filter(|v| *v != 0.0)
    }

    fn parsed(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|v| v.is_finite()),
            Self::Text(s) => parse_number(s),
            Self::Unset => None,
        }
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field-level update for one grant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrantPatch {
    /// Program name
    pub name: Option<String>,
    /// Funding source level
    pub level: Option<FundingLevel>,
    /// Award range as displayed
    pub award_range: Option<String>,
    /// Minimum award, coerced to a number
    pub min_val: Option<NumericInput>,
    /// Maximum award, coerced to a number
    pub max_val: Option<NumericInput>,
    /// When applications are accepted
    pub application_period: Option<String>,
    /// Expected award date
    pub award_date: Option<String>,
    /// Projects the program has funded
    pub project_examples: Option<String>,
    /// Local match requirement
    pub match_required: Option<String>,
    /// Who may apply
    pub eligibility: Option<String>,
    /// How the city should use the award
    pub recommended_use: Option<String>,
    /// Application status
    pub status: Option<ApplicationStatus>,
    /// Program page
    pub source_link: Option<String>,
    /// Narrative pitch
    pub narrative_draft: Option<String>,
    /// Amount actually awarded; blank or zero clears it
    pub confirmed_award_amount: Option<NumericInput>,
}

impl GrantPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status-only patch
    #[inline]
    #[must_use]
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Set the confirmed award from raw input
    #[inline]
    #[must_use]
    pub fn with_confirmed_award(mut self, input: impl Into<NumericInput>) -> Self {
        self.confirmed_award_amount = Some(input.into());
        self
    }

    /// Clear the confirmed award
    #[inline]
    #[must_use]
    pub fn clear_confirmed_award(mut self) -> Self {
        self.confirmed_award_amount = Some(NumericInput::Unset);
        self
    }

    /// Set the maximum award from raw input
    #[inline]
    #[must_use]
    pub fn with_max_val(mut self, input: impl Into<NumericInput>) -> Self {
        self.max_val = Some(input.into());
        self
    }

    /// Set the narrative draft
    #[inline]
    #[must_use]
    pub fn with_narrative(mut self, text: impl Into<String>) -> Self {
        self.narrative_draft = Some(text.into());
        self
    }

    /// Whether the patch touches nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into a grant
    pub fn apply_to(&self, grant: &mut Grant) {
        if let Some(v) = &self.name {
            grant.name.clone_from(v);
        }
        if let Some(v) = self.level {
            grant.level = v;
        }
        if let Some(v) = &self.award_range {
            grant.award_range.clone_from(v);
        }
        if let Some(v) = &self.min_val {
            grant.min_val = v.coerce();
        }
        if let Some(v) = &self.max_val {
            grant.max_val = v.coerce();
        }
        if let Some(v) = &self.application_period {
            grant.application_period.clone_from(v);
        }
        if let Some(v) = &self.award_date {
            grant.award_date = Some(v.clone());
        }
        if let Some(v) = &self.project_examples {
            grant.project_examples = Some(v.clone());
        }
        if let Some(v) = &self.match_required {
            grant.match_required.clone_from(v);
        }
        if let Some(v) = &self.eligibility {
            grant.eligibility.clone_from(v);
        }
        if let Some(v) = &self.recommended_use {
            grant.recommended_use.clone_from(v);
        }
        if let Some(v) = self.status {
            grant.status = v;
        }
        if let Some(v) = &self.source_link {
            grant.source_link.clone_from(v);
        }
        if let Some(v) = &self.narrative_draft {
            grant.narrative_draft = Some(v.clone());
        }
        if let Some(v) = &self.confirmed_award_amount {
            grant.confirmed_award_amount = v.coerce_optional();
        }
    }
}

/// Field-level update for a project's own attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    /// City name
    pub city_name: Option<String>,
    /// Strategic priorities, in order
    pub priorities: Option<Vec<String>>,
    /// Project scale
    pub scale: Option<Scale>,
    /// Equity goals
    pub equity_goals: Option<String>,
    /// Estimated budget, coerced to a number
    pub budget_estimate: Option<NumericInput>,
    /// Funding committed outside grants, coerced to a number
    pub funding_secured: Option<NumericInput>,
    /// Phasing plan
    pub phase_breakdown: Option<String>,
}

impl ProjectPatch {
    /// Rename the city
    #[inline]
    #[must_use]
    pub fn city_name(name: impl Into<String>) -> Self {
        Self {
            city_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the budget estimate from raw input
    #[inline]
    #[must_use]
    pub fn with_budget_estimate(mut self, input: impl Into<NumericInput>) -> Self {
        self.budget_estimate = Some(input.into());
        self
    }

    /// Merge into a project; does not touch grants or timestamps
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(v) = &self.city_name {
            project.city_name.clone_from(v);
        }
        if let Some(v) = &self.priorities {
            project.priorities.clone_from(v);
        }
        if let Some(v) = self.scale {
            project.scale = v;
        }
        if let Some(v) = &self.equity_goals {
            project.equity_goals.clone_from(v);
        }
        if let Some(v) = &self.budget_estimate {
            project.budget_estimate = v.coerce();
        }
        if let Some(v) = &self.funding_secured {
            project.funding_secured = v.coerce();
        }
        if let Some(v) = &self.phase_breakdown {
            project.phase_breakdown = Some(v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_input_coercion() {
        assert_eq!(NumericInput::from("1200").coerce(), 1200.0);
        assert_eq!(NumericInput::from("abc").coerce(), 0.0);
        assert_eq!(NumericInput::from(f64::NAN).coerce(), 0.0);
        assert_eq!(NumericInput::from("").coerce_optional(), None);
        assert_eq!(NumericInput::from("0").coerce_optional(), None);
        assert_eq!(NumericInput::Unset.coerce_optional(), None);
        assert_eq!(NumericInput::from(75_000.0).coerce_optional(), Some(75_000.0));
    }

    #[test]
    fn patch_retains_untouched_fields() {
        let mut grant = Grant::new("g1", "Fund").with_range(10.0, 100.0);
        grant.eligibility = "Cities under 500k".to_string();

        GrantPatch::new().with_max_val("250").apply_to(&mut grant);

        assert_eq!(grant.max_val, 250.0);
        assert_eq!(grant.min_val, 10.0);
        assert_eq!(grant.eligibility, "Cities under 500k");
        assert_eq!(grant.name, "Fund");
    }

    #[test]
    fn blank_confirmed_award_is_not_set() {
        let mut grant = Grant::new("g1", "Fund").with_confirmed_award(500.0);
        GrantPatch::new().with_confirmed_award("").apply_to(&mut grant);
        assert_eq!(grant.confirmed_award_amount, None);

        GrantPatch::new().with_confirmed_award("750").apply_to(&mut grant);
        assert_eq!(grant.confirmed_award_amount, Some(750.0));

        GrantPatch::new().clear_confirmed_award().apply_to(&mut grant);
        assert_eq!(grant.confirmed_award_amount, None);
    }

    #[test]
    fn patch_deserializes_from_form_json() {
        let patch: GrantPatch = serde_json::from_value(json!({
            "status": "Awarded",
            "confirmedAwardAmount": "42000",
            "maxVal": 50000,
        }))
        .unwrap();

        assert_eq!(patch.status, Some(ApplicationStatus::Awarded));
        assert_eq!(patch.confirmed_award_amount, Some(NumericInput::Text("42000".into())));
        assert_eq!(patch.max_val, Some(NumericInput::Number(50_000.0)));
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result: Result<GrantPatch, _> = serde_json::from_value(json!({ "maxValue": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn project_patch_coerces_budget() {
        let mut project = Project::new("austin-ab12c", "Austin");
        ProjectPatch::city_name("Austin, TX")
            .with_budget_estimate("300000")
            .apply_to(&mut project);
        assert_eq!(project.city_name, "Austin, TX");
        assert_eq!(project.budget_estimate, 300_000.0);
    }
}
