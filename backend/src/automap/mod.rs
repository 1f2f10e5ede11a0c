//! Automap - suggested source → destination bindings.
//!
//! Two sources of suggestions:
//!
//! - [`heuristic_suggestions`]: name matching, always available
//! - [`AutomapClient`]: Anthropic Messages API, when an API key is configured
//!
//! Both produce [`Suggestion`]s that are applied with
//! [`MappingSet::apply_suggestions`](crate::models::MappingSet::apply_suggestions).
//!
//! ```rust,ignore
//! let client = AutomapClient::from_settings(&settings)?;
//! let suggestions = client.suggest(&request).await?;
//! set.apply_suggestions(&suggestions, settings.confidence_threshold, &request.destination_fields);
//! ```

pub mod heuristic;
pub mod prompt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::api::logs::{log_scoped, LogLevel};
use crate::config::{Settings, DEFAULT_AI_MODEL, ENV_API_KEY};
use crate::error::{AiError, AiResult};
use crate::models::{FieldDefinition, Suggestion};

pub use heuristic::{heuristic_suggestions, normalize};

const SCOPE: &str = "automap";

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

/// Everything the automap service needs to propose bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomapRequest {
    pub source_fields: Vec<String>,
    pub destination_fields: Vec<FieldDefinition>,
    pub entity: String,
    #[serde(default)]
    pub sample_data: Map<String, Value>,
}

impl AutomapRequest {
    /// Heuristic suggestions for this request.
    pub fn heuristic(&self) -> Vec<Suggestion> {
        heuristic_suggestions(&self.source_fields, &self.destination_fields)
    }
}

/// Anthropic API client for mapping suggestions
#[derive(Clone)]
pub struct AutomapClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl std::fmt::Debug for AutomapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomapClient")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionsBody {
    suggestions: Vec<Suggestion>,
}

impl AutomapClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_AI_MODEL.to_string(),
            max_tokens: 2048,
            endpoint: ANTHROPIC_URL.to_string(),
        }
    }

    /// Client from resolved settings; fails when no API key is set.
    pub fn from_settings(settings: &Settings) -> AiResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AiError::MissingApiKey(format!("{} not set", ENV_API_KEY)))?;
        Ok(Self::new(api_key).with_model(&settings.ai_model))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Point at a different Messages endpoint (proxies, gateways).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask for suggestions, retrying failed attempts.
    pub async fn suggest(&self, request: &AutomapRequest) -> AiResult<Vec<Suggestion>> {
        let mut last_error = None;

        for attempt in 1..=DEFAULT_MAX_RETRIES {
            match self.try_suggest(request).await {
                Ok(suggestions) => {
                    log_scoped(
                        LogLevel::Success,
                        SCOPE,
                        format!("Received {} suggestions for {}", suggestions.len(), request.entity),
                    );
                    return Ok(suggestions);
                }
                Err(e) => {
                    log_scoped(
                        LogLevel::Warning,
                        SCOPE,
                        format!("Attempt {}/{} failed: {}", attempt, DEFAULT_MAX_RETRIES, e),
                    );
                    last_error = Some(e);
                    if attempt < DEFAULT_MAX_RETRIES {
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::ApiError("Unknown error".to_string())))
    }

    async fn try_suggest(&self, request: &AutomapRequest) -> AiResult<Vec<Suggestion>> {
        let text = self.call_api(request).await?;
        let suggestions = parse_suggestions(&text)?;
        Ok(retain_known(suggestions, request))
    }

    async fn call_api(&self, request: &AutomapRequest) -> AiResult<String> {
        log_scoped(
            LogLevel::Info,
            SCOPE,
            format!(
                "Requesting suggestions from {} ({} source fields, {} destinations)",
                self.model,
                request.source_fields.len(),
                request.destination_fields.len()
            ),
        );

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "system": prompt::system_prompt(),
            "messages": prompt::build_messages(request),
        });

        let response = reqwest::Client::new()
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(AiError::ApiError(error.error.message));
            }
            return Err(AiError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        response_text(&body)
    }
}

/// Concatenated text blocks of a Messages API response body.
fn response_text(body: &str) -> AiResult<String> {
    let response: AnthropicResponse = serde_json::from_str(body).map_err(|e| AiError::InvalidJson(e.to_string()))?;

    let text = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .map(|c| c.text.as_str())
        .collect::<String>();

    if text.is_empty() {
        return Err(AiError::InvalidJson("Empty response".to_string()));
    }
    Ok(text)
}

/// Suggestions from model output that may wrap the JSON in prose or a code fence.
///
/// Confidence is clamped to `0..=1`.
pub fn parse_suggestions(text: &str) -> AiResult<Vec<Suggestion>> {
    let json = extract_json(text);
    let body: SuggestionsBody = serde_json::from_str(&json).map_err(|e| {
        AiError::ParseError(format!(
            "{}. Response was: {}",
            e,
            text.chars().take(500).collect::<String>()
        ))
    })?;

    Ok(body
        .suggestions
        .into_iter()
        .map(|mut s| {
            s.confidence = if s.confidence.is_finite() { s.confidence.clamp(0.0, 1.0) } else { 0.0 };
            s
        })
        .collect())
}

/// Drop suggestions naming fields the request does not have.
fn retain_known(suggestions: Vec<Suggestion>, request: &AutomapRequest) -> Vec<Suggestion> {
    let sources: HashSet<&str> = request.source_fields.iter().map(String::as_str).collect();
    let destinations: HashSet<&str> = request.destination_fields.iter().map(|f| f.name.as_str()).collect();

    let (known, unknown): (Vec<_>, Vec<_>) = suggestions.into_iter().partition(|s| {
        sources.contains(s.source.as_str()) && destinations.contains(s.destination.as_str())
    });
    for s in &unknown {
        log_scoped(
            LogLevel::Warning,
            SCOPE,
            format!("Ignored suggestion {} -> {}: unknown field", s.source, s.destination),
        );
    }
    known
}

/// JSON object out of text that may contain markdown code blocks
fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        if let Some(len) = text[body_start..].find("```") {
            return text[body_start..body_start + len].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        let after = start + 3;
        let body_start = text[after..].find('\n').map(|i| after + i + 1).unwrap_or(after);
        if let Some(len) = text[body_start..].find("```") {
            return text[body_start..body_start + len].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;

    fn request() -> AutomapRequest {
        AutomapRequest {
            source_fields: vec!["EQ_NO".into(), "DESC".into()],
            destination_fields: vec![
                FieldDefinition::new("assetTag", "Asset Tag", DataType::String).required(),
                FieldDefinition::new("description", "Description", DataType::String).required(),
            ],
            entity: "Asset".into(),
            sample_data: Map::new(),
        }
    }

    #[test]
    fn test_extract_json_from_code_block() {
        let text = "Here you go:\n\n```json\n{\"suggestions\": []}\n```\n\nDone.";
        assert_eq!(extract_json(text), "{\"suggestions\": []}");
    }

    #[test]
    fn test_extract_json_from_plain_fence() {
        let text = "```\n{\"suggestions\": []}\n```";
        assert_eq!(extract_json(text), "{\"suggestions\": []}");
    }

    #[test]
    fn test_extract_raw_json() {
        let text = "Sure! {\"suggestions\": []} Hope this helps.";
        assert_eq!(extract_json(text), "{\"suggestions\": []}");
    }

    #[test]
    fn test_parse_suggestions_clamps_confidence() {
        let text = r#"{"suggestions": [
            {"source": "EQ_NO", "destination": "assetTag", "confidence": 1.4},
            {"source": "DESC", "destination": "description", "confidence": 0.7}
        ]}"#;
        let suggestions = parse_suggestions(text).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].confidence, 1.0);
        assert_eq!(suggestions[1].confidence, 0.7);
    }

    #[test]
    fn test_parse_suggestions_rejects_other_shapes() {
        assert!(matches!(parse_suggestions("no json here"), Err(AiError::ParseError(_))));
        assert!(matches!(parse_suggestions("{\"mappings\": []}"), Err(AiError::ParseError(_))));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let suggestions = vec![
            Suggestion::new("EQ_NO", "assetTag", 0.9),
            Suggestion::new("EQ_NO", "serialNumber", 0.9),
            Suggestion::new("GHOST", "description", 0.9),
        ];
        let kept = retain_known(suggestions, &request());
        assert_eq!(kept, vec![Suggestion::new("EQ_NO", "assetTag", 0.9)]);
    }

    #[test]
    fn test_response_text() {
        let body = r#"{"content": [{"type": "text", "text": "{\"suggestions\": []}"}]}"#;
        assert_eq!(response_text(body).unwrap(), "{\"suggestions\": []}");
        assert!(matches!(response_text(r#"{"content": []}"#), Err(AiError::InvalidJson(_))));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = Settings::default();
        assert!(matches!(AutomapClient::from_settings(&settings), Err(AiError::MissingApiKey(_))));

        let settings = Settings {
            api_key: Some("sk-test".into()),
            ai_model: "custom-model".into(),
            ..Settings::default()
        };
        let client = AutomapClient::from_settings(&settings).unwrap();
        assert_eq!(client.model(), "custom-model");
        assert!(!format!("{:?}", client).contains("sk-test"));
    }

    #[test]
    fn test_request_heuristic() {
        let mut req = request();
        req.source_fields.push("Description".into());
        let suggestions = req.heuristic();
        assert_eq!(suggestions, vec![Suggestion::new("Description", "description", 1.0)]);
    }
}
