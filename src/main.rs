use std::net::SocketAddr;
use std::sync::Arc;

use rust_lead_intake::config::Config;
use rust_lead_intake::handlers::{self, AppState};
use rust_lead_intake::intake::LeadIntake;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, builds the Pipefy-backed intake
/// workflow and serves it with per-IP rate limiting on the lead route.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let intake = LeadIntake::from_config(&config.pipefy)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Pipefy client: {}", e))?;
    tracing::info!("✓ Pipefy client initialized: {}", config.pipefy.api_url);

    let app_state = Arc::new(AppState { intake });

    // Configure rate limiter per IP
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| {
                anyhow::anyhow!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be greater than 0")
            })?,
    );

    // Health check bypasses rate limiting
    let app = handlers::app(
        app_state,
        handlers::lead_routes().layer(GovernorLayer {
            config: governor_conf,
        }),
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
