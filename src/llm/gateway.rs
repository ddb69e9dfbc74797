use crate::error::Result;
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::safety::{uniform_safety_settings, HarmBlockThreshold, SafetySetting};
use async_trait::async_trait;

/// Configuration for LLM completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 1.0,
            top_k: 32,
            max_output_tokens: 4096,
            safety_settings: uniform_safety_settings(HarmBlockThreshold::BlockMediumAndAbove),
        }
    }
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete an LLM request with text response
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse>;
}
