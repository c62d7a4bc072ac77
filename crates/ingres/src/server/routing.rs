//! Axum router configuration for all endpoints

use axum::{
  extract::DefaultBodyLimit,
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{ask, ingest, predictions, status, voice};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppState;

/// Spreadsheets and recordings are larger than axum's default body limit
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Assistant endpoints
    .route("/ask", get(ask::ask))
    .route("/ingres", post(ingest::run_ingest))
    .route("/voice/complete", post(voice::voice_complete))
    // Analytics endpoints
    .route("/get_locations", get(predictions::get_locations))
    .route("/get_predictions", get(predictions::get_predictions))
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
    .layer(middleware::from_fn(request_context_middleware))
    .with_state(state)
}
