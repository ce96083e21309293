//! Generation contract
//!
//! Creation runs two stages: an analysis of the city's needs, then a grant
//! discovery keyed on that analysis. Both outputs are untrusted; every field
//! is optional or defaulted and the caller fills the gaps.

use crate::error::GenerationError;
use async_trait::async_trait;
use grantdesk_model::{lenient, ApplicationStatus, FundingLevel, Grant, GrantId, Project, Scale, PLACEHOLDER_LINK};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Strategy produced by the analysis stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Strategic priorities
    #[serde(default, deserialize_with = "lenient::sequence")]
    pub priorities: Vec<String>,
    /// Installation footprint label
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub scale: Option<String>,
    /// Equity goals
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub equity_goals: Option<String>,
    /// Estimated total budget
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub budget_estimate: Option<f64>,
    /// Funding already committed
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub funding_secured: Option<f64>,
    /// Phasing notes
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub phase_breakdown: Option<String>,
}

impl Analysis {
    /// Copy the analysis onto a fresh project, defaulting what is missing
    ///
    /// A missing budget becomes `fallback_budget`, missing secured funding
    /// becomes zero and a missing scale becomes citywide.
    pub fn apply_to(&self, project: &mut Project, fallback_budget: f64) {
        project.priorities.clone_from(&self.priorities);
        project.scale = self.scale.clone().map(Scale::from).unwrap_or_default();
        project.equity_goals = self.equity_goals.clone().unwrap_or_default();
        project.budget_estimate = self.budget_estimate.unwrap_or(fallback_budget);
        project.funding_secured = self.funding_secured.unwrap_or(0.0);
        project.phase_breakdown.clone_from(&self.phase_breakdown);
    }
}

/// Grant as proposed by the discovery stage, before id and status assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantCandidate {
    /// Program name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Funding source level
    #[serde(default, deserialize_with = "lenient::label")]
    pub level: FundingLevel,
    /// Award range as displayed
    #[serde(default, deserialize_with = "lenient::string")]
    pub award_range: String,
    /// Minimum award
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_val: f64,
    /// Maximum award
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_val: f64,
    /// When applications are accepted
    #[serde(default, deserialize_with = "lenient::string")]
    pub application_period: String,
    /// Expected award date
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub award_date: Option<String>,
    /// Projects the program has funded
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub project_examples: Option<String>,
    /// Local match requirement
    #[serde(default, deserialize_with = "lenient::string")]
    pub match_required: String,
    /// Who may apply
    #[serde(default, deserialize_with = "lenient::string")]
    pub eligibility: String,
    /// How the city should use the award
    #[serde(default, deserialize_with = "lenient::string")]
    pub recommended_use: String,
    /// Program page, if the model cited one
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub source_link: Option<String>,
    /// Drafted narrative pitch
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub narrative_draft: Option<String>,
}

impl GrantCandidate {
    /// Candidate with just a name and maximum award
    #[must_use]
    pub fn new(name: impl Into<String>, max_val: f64) -> Self {
        Self {
            name: name.into(),
            max_val,
            ..Self::default()
        }
    }

    /// Assign id and status
    ///
    /// A blank or placeholder source link is replaced by the grounding URL at
    /// `index % len`, or by the placeholder when there are none.
    #[must_use]
    pub fn into_grant(self, index: usize, created_at_ms: i64, grounding_urls: &[String]) -> Grant {
        let source_link = match self.source_link {
            Some(link) if !link.trim().is_empty() && link != PLACEHOLDER_LINK => link,
            _ if grounding_urls.is_empty() => PLACEHOLDER_LINK.to_string(),
            _ => grounding_urls[index % grounding_urls.len()].clone(),
        };
        Grant {
            id: GrantId::assigned(index, created_at_ms),
            name: self.name,
            level: self.level,
            award_range: self.award_range,
            min_val: self.min_val,
            max_val: self.max_val,
            application_period: self.application_period,
            award_date: self.award_date,
            project_examples: self.project_examples,
            match_required: self.match_required,
            eligibility: self.eligibility,
            recommended_use: self.recommended_use,
            status: ApplicationStatus::NotStarted,
            source_link,
            narrative_draft: self.narrative_draft,
            confirmed_award_amount: None,
        }
    }
}

/// Output of the discovery stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Proposed grants in the order the service listed them
    pub candidates: Vec<GrantCandidate>,
    /// Web sources the service grounded its answer on
    pub grounding_urls: Vec<String>,
}

impl Discovery {
    /// Turn every candidate into a tracked grant, preserving order
    #[must_use]
    pub fn into_grants(self, created_at_ms: i64) -> Vec<Grant> {
        let urls = self.grounding_urls;
        self.candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| candidate.into_grant(i, created_at_ms, &urls))
            .collect()
    }
}

/// External service that drafts a project's content
#[async_trait]
pub trait Generator: Send + Sync + Debug {
    /// Analyze a city's needs given free-text context
    async fn analyze(&self, city_name: &str, context: &str) -> Result<Analysis, GenerationError>;

    /// Find funding opportunities matching an analysis
    async fn discover_grants(&self, city_name: &str, analysis: &Analysis) -> Result<Discovery, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn analysis_defaults_missing_fields() {
        let analysis: Analysis = serde_json::from_value(json!({
            "priorities": ["Park access"],
            "budgetEstimate": "not a number",
            "scale": "Single Site",
        }))
        .unwrap();

        let mut project = Project::new("reno-aaaaa", "Reno");
        analysis.apply_to(&mut project, 250_000.0);

        assert_eq!(project.priorities, vec!["Park access".to_string()]);
        assert_eq!(project.scale, Scale::SingleSite);
        assert_eq!(project.budget_estimate, 250_000.0);
        assert_eq!(project.funding_secured, 0.0);
        assert_eq!(project.equity_goals, "");
    }

    #[test]
    fn empty_analysis_object_is_accepted() {
        let analysis: Analysis = serde_json::from_value(json!({ "priorities": null })).unwrap();
        assert_eq!(analysis, Analysis::default());
    }

    #[test]
    fn candidates_get_ids_status_and_grounded_links() {
        let mut with_link = GrantCandidate::new("Parks Fund", 100_000.0);
        with_link.source_link = Some("https://parks.example.org".into());
        let mut placeholder = GrantCandidate::new("Health Fund", 50_000.0);
        placeholder.source_link = Some("#".into());

        let discovery = Discovery {
            candidates: vec![
                with_link,
                placeholder,
                GrantCandidate::new("LWCF", 500_000.0),
                GrantCandidate::new("CDBG", 750_000.0),
            ],
            grounding_urls: vec!["https://a.example".into(), "https://b.example".into()],
        };

        let grants = discovery.into_grants(1_700_000_000_000);
        let ids: Vec<&str> = grants.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "grant-0-1700000000000",
                "grant-1-1700000000000",
                "grant-2-1700000000000",
                "grant-3-1700000000000"
            ]
        );
        assert!(grants.iter().all(|g| g.status == ApplicationStatus::NotStarted));
        assert_eq!(grants[0].source_link, "https://parks.example.org");
        assert_eq!(grants[1].source_link, "https://b.example");
        assert_eq!(grants[2].source_link, "https://a.example");
        assert_eq!(grants[3].source_link, "https://b.example");
    }

    #[test]
    fn no_grounding_falls_back_to_placeholder() {
        let grant = GrantCandidate::new("Fund", 1.0).into_grant(0, 1, &[]);
        assert_eq!(grant.source_link, PLACEHOLDER_LINK);
        assert!(!grant.has_source_link());
    }
}
