pub mod analyzer;
pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod server;

pub use error::{DishVisionError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analyzer::{DishAnalyzer, DEFAULT_PROMPT};
    pub use crate::config::AppConfig;
    pub use crate::error::{DishVisionError, Result};
    pub use crate::image::{read_image, ImagePayload};
    pub use crate::llm::gateways::GeminiGateway;
    pub use crate::llm::{CompletionConfig, LlmBroker, LlmGateway, LlmMessage};
}
