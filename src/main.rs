use anyhow::Context;
use dish_vision::config::{load_dotenv, AppConfig};
use dish_vision::prelude::*;
use dish_vision::server::{self, AppState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(Some(path)) => info!("Loaded environment from {:?}", path),
        Ok(None) => {}
        Err(e) => warn!("Ignoring .env: {}", e),
    }

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!("Using model {} at {}", config.model, config.gemini.base_url);

    let gateway = GeminiGateway::with_config(config.gemini.clone())
        .context("failed to build Gemini client")?;
    let broker = LlmBroker::new(config.model.clone(), Arc::new(gateway), config.completion.clone());
    let analyzer = Arc::new(DishAnalyzer::new(broker, config.prompt.clone()));

    server::serve(config.bind_addr, AppState::new(analyzer, config.upload_dir.clone())).await?;

    Ok(())
}
