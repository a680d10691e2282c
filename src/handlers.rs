use crate::intake::LeadIntake;
use crate::models::LeadResponse;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted lead submission.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead intake workflow bound to the configured Pipefy tables.
    pub intake: LeadIntake,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/leads
///
/// Takes the raw body so that unparsable JSON is answered by the workflow's
/// own 400 instead of the extractor's rejection.
pub async fn submit_lead(State(state): State<Arc<AppState>>, body: Bytes) -> LeadResponse {
    tracing::info!("📨 Received lead submission ({} bytes)", body.len());
    tracing::debug!("Event body: {}", String::from_utf8_lossy(&body));

    state.intake.submit_lead(&body).await
}

/// Lead routes with tracing, CORS and the body limit.
///
/// Rate limiting needs the peer address and is layered on by the binary.
pub fn lead_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/leads", post(submit_lead))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Full application router without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    app(state, lead_routes())
}

/// Health check plus the given lead routes, with the shared outer layers.
/// The health check stays outside any layer applied to `leads`.
pub fn app(state: Arc<AppState>, leads: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(leads)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
