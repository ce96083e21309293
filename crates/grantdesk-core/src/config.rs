//! Workspace configuration

use serde::Deserialize;
use std::time::Duration;

/// Controller settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Seconds between background health probes
    pub health_interval_secs: u64,
    /// Budget used when analysis yields none
    pub fallback_budget: f64,
    /// Context handed to the analysis stage
    pub generation_context: String,
    /// Length of the random project id suffix; at least one character is used
    pub id_suffix_len: usize,
    /// Fixed seed for reproducible project ids
    pub rng_seed: Option<u64>,
}

impl WorkspaceConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set health probe interval
    #[inline]
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval_secs = interval.as_secs().max(1);
        self
    }

    /// Set fallback budget
    #[inline]
    #[must_use]
    pub fn with_fallback_budget(mut self, budget: f64) -> Self {
        self.fallback_budget = budget;
        self
    }

    /// Set generation context
    #[inline]
    #[must_use]
    pub fn with_generation_context(mut self, context: impl Into<String>) -> Self {
        self.generation_context = context.into();
        self
    }

    /// Seed the id generator
    #[inline]
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Health probe interval
    #[inline]
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.max(1))
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: 20,
            fallback_budget: 250_000.0,
            generation_context: "Public fitness court and park infrastructure framework".to_string(),
            id_suffix_len: grantdesk_model::DEFAULT_SUFFIX_LEN,
            rng_seed: None,
        }
    }
}
