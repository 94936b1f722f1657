use finance_assistant::{
    assistant::Assistant, config::AssistantConfig, models::Humor, store::build_store,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AssistantConfig::from_env()?;
    let store = build_store(&config);
    let assistant = Arc::new(Assistant::from_config(&config, store)?);

    let user_id = Uuid::new_v4();
    info!(user_id = %user_id, "Finance assistant session started");

    println!("💰 Finance Assistant");
    println!("Ask about profit, margin or ROI. Commands: /humor <default|sarcastic|empathetic>, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        if let Some(raw) = line.strip_prefix("/humor") {
            match raw.trim().parse::<Humor>() {
                Ok(humor) => {
                    assistant.set_humor(user_id, humor).await;
                    println!("Humor set to {}", humor);
                }
                Err(e) => eprintln!("{}", e),
            }
            continue;
        }

        match assistant.handle(user_id, line).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(e) => eprintln!("⚠️  {}", e),
        }
    }

    Ok(())
}
