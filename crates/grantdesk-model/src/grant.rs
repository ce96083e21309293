//! Grant records
//!
//! A grant is one candidate funding opportunity plus the user's tracking
//! state for its application.

use crate::id::GrantId;
use crate::lenient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when no source link is known
pub const PLACEHOLDER_LINK: &str = "#";

/// Tier of the funding body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum FundingLevel {
    /// Municipal or community sources
    #[default]
    Local,
    /// State programmes
    State,
    /// Federal programmes
    Federal,
    /// Private foundations and healthcare systems
    Private,
}

impl FundingLevel {
    /// All levels in display order
    pub const ALL: [FundingLevel; 4] = [Self::Local, Self::State, Self::Federal, Self::Private];

    /// Wire label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::State => "State",
            Self::Federal => "Federal",
            Self::Private => "Private/Healthcare",
        }
    }
}

impl From<String> for FundingLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "state" => Self::State,
            "federal" => Self::Federal,
            "private/healthcare" | "private" | "healthcare" => Self::Private,
            _ => Self::Local,
        }
    }
}

impl From<FundingLevel> for &'static str {
    fn from(value: FundingLevel) -> Self {
        value.label()
    }
}

impl fmt::Display for FundingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Application lifecycle state; any state may follow any other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ApplicationStatus {
    /// Nothing done yet
    #[default]
    NotStarted,
    /// Application being drafted
    InProgress,
    /// Application submitted, awaiting decision
    Submitted,
    /// Funding awarded
    Awarded,
    /// Application denied
    Denied,
}

impl ApplicationStatus {
    /// All states in display order
    pub const ALL: [ApplicationStatus; 5] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Submitted,
        Self::Awarded,
        Self::Denied,
    ];

    /// Wire label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Submitted => "Submitted",
            Self::Awarded => "Awarded",
            Self::Denied => "Denied",
        }
    }

    /// Parse a label, accepting the wire form or a kebab/snake variant
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "notstarted" => Some(Self::NotStarted),
            "inprogress" => Some(Self::InProgress),
            "submitted" => Some(Self::Submitted),
            "awarded" => Some(Self::Awarded),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

impl From<String> for ApplicationStatus {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or_default()
    }
}

impl From<ApplicationStatus> for &'static str {
    fn from(value: ApplicationStatus) -> Self {
        value.label()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn placeholder_link() -> String {
    PLACEHOLDER_LINK.to_string()
}

/// One funding opportunity and its application tracking state
///
/// `confirmed_award_amount` is only meaningful once the status is
/// [`ApplicationStatus::Awarded`]; nothing enforces that pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    /// Id assigned at generation time
    pub id: GrantId,
    /// Display name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Funding tier
    #[serde(default, deserialize_with = "lenient::label")]
    pub level: FundingLevel,
    /// Free-text award range
    #[serde(default, deserialize_with = "lenient::string")]
    pub award_range: String,
    /// Lower bound of the award
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_val: f64,
    /// Upper bound of the award
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_val: f64,
    /// When the cycle opens and closes
    #[serde(default, deserialize_with = "lenient::string")]
    pub application_period: String,
    /// When awards are announced
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub award_date: Option<String>,
    /// Comparable funded projects
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub project_examples: Option<String>,
    /// Match requirements
    #[serde(default, deserialize_with = "lenient::string")]
    pub match_required: String,
    /// Eligibility notes
    #[serde(default, deserialize_with = "lenient::string")]
    pub eligibility: String,
    /// Recommended use of the funds
    #[serde(default, deserialize_with = "lenient::string")]
    pub recommended_use: String,
    /// Application status
    #[serde(default, deserialize_with = "lenient::label")]
    pub status: ApplicationStatus,
    /// Source URL or [`PLACEHOLDER_LINK`]
    #[serde(default = "placeholder_link", deserialize_with = "lenient::string")]
    pub source_link: String,
    /// Narrative pitch drafted by the user
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub narrative_draft: Option<String>,
    /// Amount actually awarded
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub confirmed_award_amount: Option<f64>,
}

impl Grant {
    /// Create a grant with the given id and name; every other field empty
    #[must_use]
    pub fn new(id: impl Into<GrantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level: FundingLevel::default(),
            award_range: String::new(),
            min_val: 0.0,
            max_val: 0.0,
            application_period: String::new(),
            award_date: None,
            project_examples: None,
            match_required: String::new(),
            eligibility: String::new(),
            recommended_use: String::new(),
            status: ApplicationStatus::default(),
            source_link: placeholder_link(),
            narrative_draft: None,
            confirmed_award_amount: None,
        }
    }

    /// With funding level
    #[inline]
    #[must_use]
    pub fn with_level(mut self, level: FundingLevel) -> Self {
        self.level = level;
        self
    }

    /// With award bounds
    #[inline]
    #[must_use]
    pub fn with_range(mut self, min_val: f64, max_val: f64) -> Self {
        self.min_val = min_val;
        self.max_val = max_val;
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = status;
        self
    }

    /// With confirmed award amount
    #[inline]
    #[must_use]
    pub fn with_confirmed_award(mut self, amount: f64) -> Self {
        self.confirmed_award_amount = Some(amount);
        self
    }

    /// Contribution to the identified-potential total
    #[inline]
    #[must_use]
    pub fn potential_value(&self) -> f64 {
        lenient::finite_or_zero(self.max_val)
    }

    /// Contribution to the secured-from-grants total
    ///
    /// Zero unless awarded; prefers the confirmed amount over the maximum.
    #[must_use]
    pub fn secured_value(&self) -> f64 {
        if self.status != ApplicationStatus::Awarded {
            return 0.0;
        }
        match self.confirmed_award_amount {
            Some(amount) if amount.is_finite() => amount,
            _ => lenient::finite_or_zero(self.max_val),
        }
    }

    /// Awarded but the final amount has not been entered yet
    #[inline]
    #[must_use]
    pub fn needs_award_confirmation(&self) -> bool {
        self.status == ApplicationStatus::Awarded && self.confirmed_award_amount.is_none()
    }

    /// Whether the source link points anywhere
    #[inline]
    #[must_use]
    pub fn has_source_link(&self) -> bool {
        !self.source_link.trim().is_empty() && self.source_link != PLACEHOLDER_LINK
    }

    /// Narrative text prepared for pasting into an application
    #[must_use]
    pub fn narrative_export(&self) -> String {
        format!(
            "Alignment for {}: {}",
            self.name,
            self.narrative_draft.as_deref().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn labels_round_trip_through_serde() {
        for status in ApplicationStatus::ALL {
            let encoded = serde_json::to_value(status).unwrap();
            assert_eq!(encoded, json!(status.label()));
            let decoded: ApplicationStatus = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, status);
        }
        assert_eq!(serde_json::to_value(FundingLevel::Private).unwrap(), json!("Private/Healthcare"));
    }

    #[test]
    fn status_parse_accepts_variants() {
        assert_eq!(ApplicationStatus::parse("in-progress"), Some(ApplicationStatus::InProgress));
        assert_eq!(ApplicationStatus::parse("NOT_STARTED"), Some(ApplicationStatus::NotStarted));
        assert_eq!(ApplicationStatus::parse("won"), None);
    }

    #[test]
    fn lenient_decoding_of_service_output() {
        let grant: Grant = serde_json::from_value(json!({
            "id": "grant-0-1",
            "name": "Community Health Fund",
            "level": "federal",
            "maxVal": "50000",
            "minVal": null,
            "matchRequired": null,
            "status": "something else",
            "confirmedAwardAmount": "",
        }))
        .unwrap();

        assert_eq!(grant.level, FundingLevel::Federal);
        assert_eq!(grant.max_val, 50_000.0);
        assert_eq!(grant.min_val, 0.0);
        assert_eq!(grant.match_required, "");
        assert_eq!(grant.status, ApplicationStatus::NotStarted);
        assert_eq!(grant.confirmed_award_amount, None);
        assert_eq!(grant.source_link, PLACEHOLDER_LINK);
    }

    #[test]
    fn optional_fields_serialize_as_null() {
        let value = serde_json::to_value(Grant::new("g1", "Fund")).unwrap();
        assert_eq!(value["confirmedAwardAmount"], serde_json::Value::Null);
        assert_eq!(value["narrativeDraft"], serde_json::Value::Null);
    }

    #[test]
    fn secured_value_prefers_confirmed_amount() {
        let awarded = Grant::new("g1", "Fund")
            .with_range(0.0, 100.0)
            .with_status(ApplicationStatus::Awarded);
        assert_eq!(awarded.secured_value(), 100.0);
        assert!(awarded.needs_award_confirmation());

        let confirmed = awarded.clone().with_confirmed_award(80.0);
        assert_eq!(confirmed.secured_value(), 80.0);
        assert!(!confirmed.needs_award_confirmation());

        let submitted = confirmed.with_status(ApplicationStatus::Submitted);
        assert_eq!(submitted.secured_value(), 0.0);
    }

    #[test]
    fn narrative_export_format() {
        let mut grant = Grant::new("g1", "Parks Fund");
        grant.narrative_draft = Some("Closes the east-side access gap.".to_string());
        assert_eq!(
            grant.narrative_export(),
            "Alignment for Parks Fund: Closes the east-side access gap."
        );
    }
}
