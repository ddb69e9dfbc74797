pub mod broker;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod safety;

pub use broker::LlmBroker;
pub use gateway::{CompletionConfig, LlmGateway};
pub use models::{LlmGatewayResponse, LlmMessage};
pub use safety::{HarmBlockThreshold, HarmCategory, SafetySetting};
