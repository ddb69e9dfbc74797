use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::LlmMessage;
use std::sync::Arc;
use tracing::{info, warn};

/// Main interface for LLM interactions
///
/// Binds a model name, a gateway and the completion settings chosen at startup so that
/// every request goes out with the same generation and safety parameters.
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
    config: CompletionConfig,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(
        model: impl Into<String>,
        gateway: Arc<dyn LlmGateway>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            model: model.into(),
            gateway,
            config,
        }
    }

    /// Generate text response from LLM
    pub async fn generate(&self, messages: &[LlmMessage]) -> Result<String> {
        info!("Requesting completion from {}", self.model);

        let response = self.gateway.complete(&self.model, messages, &self.config).await?;

        if let Some(reason) = response.finish_reason.as_deref() {
            if reason == "MAX_TOKENS" {
                warn!("Response truncated at {} output tokens", self.config.max_output_tokens);
            }
        }

        Ok(response.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DishVisionError;
    use crate::llm::models::LlmGatewayResponse;
    use std::sync::Mutex;

    // Mock gateway for testing
    struct MockGateway {
        response: Result<LlmGatewayResponse>,
        seen: Mutex<Vec<(String, CompletionConfig)>>,
    }

    impl MockGateway {
        fn new(response: Result<LlmGatewayResponse>) -> Self {
            Self {
                response,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            model: &str,
            _messages: &[LlmMessage],
            config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            self.seen.lock().unwrap().push((model.to_string(), config.clone()));
            match &self.response {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(DishVisionError::GatewayError(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_generate_returns_content() {
        let gateway = Arc::new(MockGateway::new(Ok(LlmGatewayResponse {
            content: Some("Phở bò".to_string()),
            finish_reason: Some("STOP".to_string()),
        })));
        let broker = LlmBroker::new("test-model", gateway.clone(), CompletionConfig::default());

        let result = broker.generate(&[LlmMessage::user("Hi")]).await.unwrap();

        assert_eq!(result, "Phở bò");
    }

    #[tokio::test]
    async fn test_generate_passes_model_and_config() {
        let gateway = Arc::new(MockGateway::new(Ok(LlmGatewayResponse::default())));
        let config = CompletionConfig {
            temperature: 0.1,
            ..Default::default()
        };
        let broker = LlmBroker::new("gemini-test", gateway.clone(), config.clone());

        broker.generate(&[LlmMessage::user("Hi")]).await.unwrap();

        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "gemini-test");
        assert_eq!(seen[0].1, config);
    }

    #[tokio::test]
    async fn test_generate_empty_content() {
        let gateway = Arc::new(MockGateway::new(Ok(LlmGatewayResponse {
            content: None,
            finish_reason: Some("MAX_TOKENS".to_string()),
        })));
        let broker = LlmBroker::new("m", gateway, CompletionConfig::default());

        let result = broker.generate(&[LlmMessage::user("Hi")]).await.unwrap();

        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_generate_propagates_error() {
        let gateway = Arc::new(MockGateway::new(Err(DishVisionError::GatewayError(
            "boom".to_string(),
        ))));
        let broker = LlmBroker::new("m", gateway, CompletionConfig::default());

        let result = broker.generate(&[LlmMessage::user("Hi")]).await;

        assert!(result.is_err());
    }
}
