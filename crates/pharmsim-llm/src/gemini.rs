//! Gemini Provider
//!
//! `GenerativeModel` over the Gemini `generateContent` REST endpoint.
//! Structured output uses `responseMimeType: application/json` together with
//! `responseJsonSchema`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::model::{GenerationRequest, TurnRole};
use pharmsim_core::traits::GenerativeModel;

use crate::http_client::build_http_client;
use crate::provider::{missing_api_key_error, parse_http_error};

/// Default Gemini API root
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Used when a request carries no temperature of its own.
    pub default_temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            default_temperature: None,
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: GeminiConfig) -> SimResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing_api_key_error(PROVIDER))?;
        let client = build_http_client(config.timeout)?;
        Ok(Self { config, api_key, client })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Build the request body for the API
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        build_request_body(request, self.config.default_temperature)
    }
}

pub(crate) fn build_request_body(
    request: &GenerationRequest,
    default_temperature: Option<f32>,
) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = request
        .turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            };
            serde_json::json!({
                "role": role,
                "parts": [{ "text": turn.text }]
            })
        })
        .collect();

    let mut body = serde_json::json!({ "contents": contents });

    if let Some(system) = &request.system_instruction {
        body["systemInstruction"] = serde_json::json!({
            "parts": [{ "text": system }]
        });
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = request.temperature.or(default_temperature) {
        generation_config.insert("temperature".to_string(), serde_json::json!(temperature));
    }
    if let Some(schema) = &request.response_schema {
        generation_config.insert(
            "responseMimeType".to_string(),
            serde_json::json!("application/json"),
        );
        generation_config.insert("responseJsonSchema".to_string(), schema.clone());
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = serde_json::Value::Object(generation_config);
    }

    body
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_text(response: GeminiResponse) -> SimResult<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(block) => format!("{PROVIDER}: prompt blocked ({block})"),
            None => format!("{PROVIDER}: response had no candidates"),
        };
        return Err(SimError::Upstream { reason });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(SimError::Upstream {
            reason: format!("{PROVIDER}: empty response (finishReason {finish})"),
        });
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> SimResult<String> {
        let body = self.build_request_body(&request);
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SimError::Upstream {
                reason: format!("{PROVIDER}: network error: {e}"),
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| SimError::Upstream {
            reason: format!("{PROVIDER}: failed to read response: {e}"),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &text, PROVIDER));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| SimError::Parse {
            reason: format!("{PROVIDER}: unexpected response shape: {e}"),
        })?;

        debug!(
            model = %request.model,
            structured = request.response_schema.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gemini call finished"
        );
        extract_text(parsed)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}
