//! Gemini REST client
//!
//! Calls `models/{model}:generateContent` with a JSON response schema so the
//! model answers with parseable records. Discovery enables search grounding
//! and collects the cited web sources for use as fallback grant links.

use crate::contract::{Analysis, Discovery, GrantCandidate, Generator};
use crate::error::GenerationError;
use async_trait::async_trait;
use grantdesk_model::FundingLevel;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Generative Language API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Gemini client settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API root, overridden in tests
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key sent as `x-goog-api-key`
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Context text beyond this many characters is dropped
    pub max_context_chars: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 90,
            max_context_chars: 15_000,
        }
    }
}

impl GeminiConfig {
    /// Settings with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set API root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set per-request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    uri: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }

    fn grounding_urls(&self) -> Vec<String> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref()?.uri.clone())
                    .filter(|uri| !uri.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// [`Generator`] backed by the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    endpoint: Url,
}

impl GeminiClient {
    /// Build a client
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        if !config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            return Err(GenerationError::InvalidConfig("gemini api key is not set".into()));
        }
        let base = config.base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/models/{}:generateContent", config.model))
            .map_err(|e| GenerationError::InvalidConfig(format!("invalid gemini url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config, endpoint })
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn generate(&self, body: &Value) -> Result<GenerateResponse, GenerationError> {
        let mut request = self.http.post(self.endpoint.clone()).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-goog-api-key", key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(parsed) => GenerationError::Api {
                    status: parsed.error.code.unwrap_or(status.as_u16()),
                    message: parsed.error.message,
                },
                Err(_) => GenerationError::Api {
                    status: status.as_u16(),
                    message: text,
                },
            });
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    fn truncate_context<'a>(&self, context: &'a str) -> &'a str {
        match context.char_indices().nth(self.config.max_context_chars) {
            Some((cut, _)) => &context[..cut],
            None => context,
        }
    }
}

/// Strip a Markdown code fence some models wrap JSON in
fn unfence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "priorities": { "type": "ARRAY", "items": { "type": "STRING" } },
            "scale": { "type": "STRING" },
            "budgetEstimate": { "type": "NUMBER" },
            "fundingSecured": { "type": "NUMBER" },
            "equityGoals": { "type": "STRING" },
            "phaseBreakdown": { "type": "STRING" }
        },
        "required": ["priorities", "scale", "budgetEstimate", "fundingSecured", "equityGoals"]
    })
}

fn grant_schema() -> Value {
    let levels: Vec<&str> = FundingLevel::ALL.iter().map(|l| l.label()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "level": { "type": "STRING", "enum": levels },
                "awardRange": { "type": "STRING" },
                "minVal": { "type": "NUMBER" },
                "maxVal": { "type": "NUMBER" },
                "applicationPeriod": { "type": "STRING" },
                "awardDate": { "type": "STRING" },
                "projectExamples": { "type": "STRING" },
                "matchRequired": { "type": "STRING" },
                "eligibility": { "type": "STRING" },
                "recommendedUse": { "type": "STRING" },
                "sourceLink": { "type": "STRING" },
                "narrativeDraft": { "type": "STRING" }
            },
            "required": ["name", "level", "maxVal", "applicationPeriod"]
        }
    })
}

fn analysis_prompt(city_name: &str) -> String {
    format!(
        "You are a grant research analyst preparing a funding strategy for an outdoor \
         fitness court and park infrastructure project in {city_name}. From the material \
         below, extract the total project budget (estimate a typical cost if none is given), \
         any funding already committed, and the core priorities with attention to health \
         equity, park access and community wellness. Answer in JSON."
    )
}

fn discovery_prompt(city_name: &str, analysis: &Analysis) -> String {
    format!(
        "List 8 to 10 currently open funding opportunities for a public fitness court and \
         park project in {city_name}. Cover local foundations such as the community \
         foundation serving {city_name}, state health or recreation grants, and federal \
         programs such as CDBG or the Land and Water Conservation Fund. Project focus: {}. \
         Answer with a JSON array.",
        analysis.priorities.join(", ")
    )
}

#[async_trait]
impl Generator for GeminiClient {
    async fn analyze(&self, city_name: &str, context: &str) -> Result<Analysis, GenerationError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": analysis_prompt(city_name) },
                    { "text": self.truncate_context(context) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": analysis_schema(),
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        });

        let response = self.generate(&body).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        let analysis: Analysis =
            serde_json::from_str(unfence(&text)).map_err(|e| GenerationError::Malformed(e.to_string()))?;
        tracing::debug!(city = city_name, priorities = analysis.priorities.len(), "analysis received");
        Ok(analysis)
    }

    async fn discover_grants(&self, city_name: &str, analysis: &Analysis) -> Result<Discovery, GenerationError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": discovery_prompt(city_name, analysis) }]
            }],
            "tools": [{ "googleSearch": {} }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": grant_schema(),
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        });

        let response = self.generate(&body).await?;
        let grounding_urls = response.grounding_urls();
        let text = response.text();
        // no content means no opportunities were found
        let candidates: Vec<GrantCandidate> = if text.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(unfence(&text)).map_err(|e| GenerationError::Malformed(e.to_string()))?
        };
        tracing::debug!(
            city = city_name,
            candidates = candidates.len(),
            sources = grounding_urls.len(),
            "grant discovery received"
        );
        Ok(Discovery {
            candidates,
            grounding_urls,
        })
    }
}
