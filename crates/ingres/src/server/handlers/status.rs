//! Status and version endpoint handlers

use axum::extract::State;
use axum::response::Json;
use chrono::Utc;

use crate::server::state::AppState;
use crate::server::types::{StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
  Json(StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    predictions_loaded: state.predictions.len(),
    started_at: state.started_at,
    uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
  })
}

/// GET /version - Returns current API version
pub async fn version() -> Json<VersionResponse> {
  Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}
