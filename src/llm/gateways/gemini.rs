//! Gemini gateway for LLM interactions.
//!
//! Talks to the `generateContent` REST endpoint of Google's Generative Language API.
//! Images travel inline as base64 alongside the text parts of a message.

use crate::error::{DishVisionError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Finish reasons that mean the provider withheld the answer.
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// Configuration for connecting to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

/// Gateway for the hosted Gemini models.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Create a gateway from a fully specified configuration.
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(GeminiConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: None,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.config.base_url.trim_end_matches('/'), model)
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Gemini for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = serde_json::json!({
            "contents": adapt_messages_to_gemini(messages),
            "generationConfig": extract_generation_config(config),
            "safetySettings": serde_json::to_value(&config.safety_settings)?,
        });

        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", self.config.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            warn!("Gemini API returned {}", status);
            return Err(DishVisionError::ApiError {
                status: status.as_u16(),
                message: extract_error_message(&response_text),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)?;
        response_to_text(parsed)
    }
}

// Convert messages into Gemini `contents`, text part first then inline images
fn adapt_messages_to_gemini(messages: &[LlmMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            let mut parts = Vec::with_capacity(1 + msg.images.len());

            if let Some(content) = &msg.content {
                parts.push(serde_json::json!({ "text": content }));
            }

            for image in &msg.images {
                parts.push(serde_json::json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(&image.data)
                    }
                }));
            }

            serde_json::json!({
                "role": "user",
                "parts": parts
            })
        })
        .collect()
}

fn extract_generation_config(config: &CompletionConfig) -> Value {
    serde_json::json!({
        "temperature": config.temperature,
        "topP": config.top_p,
        "topK": config.top_k,
        "maxOutputTokens": config.max_output_tokens,
    })
}

// Google wraps failures as {"error": {"code", "message", "status"}}
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn response_to_text(response: GeminiResponse) -> Result<LlmGatewayResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(DishVisionError::Blocked(reason));
        }
        return Err(DishVisionError::GatewayError("No candidates in response".to_string()));
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return match candidate.finish_reason {
            Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
                Err(DishVisionError::Blocked(reason))
            }
            reason => Err(DishVisionError::GatewayError(format!(
                "Response contained no text (finish reason: {})",
                reason.as_deref().unwrap_or("unknown")
            ))),
        };
    }

    Ok(LlmGatewayResponse {
        content: Some(texts.concat()),
        finish_reason: candidate.finish_reason,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
