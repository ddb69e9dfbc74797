use crate::image::ImagePayload;

/// User message sent to the model
///
/// Parts are sent in order: the text content first, then any attached images.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub content: Option<String>,
    pub images: Vec<ImagePayload>,
}

/// Response from LLM gateway
#[derive(Debug, Clone, Default)]
pub struct LlmGatewayResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl LlmMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            images: Vec::new(),
        }
    }

    /// Attach image payloads to this message
    pub fn with_images(mut self, images: Vec<ImagePayload>) -> Self {
        self.images = images;
        self
    }
}
