use finance_assistant::{
    api::start_server, assistant::Assistant, config::AssistantConfig, store::build_store,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AssistantConfig::from_env()?;
    if config.gemini_api_key.is_none() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env, answers stay local-only");
        eprintln!("📌 See .env.example for setup instructions");
    }

    info!("🚀 Finance Assistant - API Server");
    info!("📍 Port: {}", config.api_port);

    let store = build_store(&config);
    let assistant = Arc::new(Assistant::from_config(&config, store)?);

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    start_server(assistant, config.api_port).await?;

    Ok(())
}
