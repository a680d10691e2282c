//! Submits one lead to the configured Pipefy account and prints the response.
//!
//! Usage: cargo run --bin submit_sample [path/to/lead.json]
//!
//! Without an argument, a built-in sample lead is used.
use rust_lead_intake::config::Config;
use rust_lead_intake::intake::LeadIntake;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_intake=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let intake = LeadIntake::from_config(&config.pipefy)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Pipefy client: {}", e))?;

    let body = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read(&path).map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?
        }
        None => serde_json::to_vec(&json!({
            "phone": "+5519997265355",
            "email": "oliveira.gabriel07@gmail.com",
            "fullName": "Gabriel Oliveira",
            "zip": "01141000",
            "energyConsumption": 150.0,
            "creci": "123456"
        }))?,
    };

    let response = intake.submit_lead(&body).await;
    println!("result: {}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
