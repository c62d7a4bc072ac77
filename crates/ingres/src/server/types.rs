//! Request and response bodies

use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persona::{DEFAULT_LANGUAGE, DEFAULT_PERSONA};
use crate::pipeline::Answer;

fn default_persona() -> String {
  DEFAULT_PERSONA.to_string()
}

fn default_language() -> String {
  DEFAULT_LANGUAGE.to_string()
}

// Ask
// ===

/// Query string for GET /ask; every field is optional so the endpoint never rejects a request
#[derive(Debug, Deserialize)]
pub struct AskParams {
  #[serde(default)]
  pub query: String,
  #[serde(default = "default_persona")]
  pub persona: String,
  #[serde(default = "default_language")]
  pub language: String,
  /// `html` (default) or `structured`
  #[serde(default)]
  pub format: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
  pub answer: Answer,
}

// Ingestion
// =========

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
  pub status: String,
  pub rows: usize,
  pub inserted: usize,
}

// Voice
// =====

#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceResponse {
  pub transcribed_text: String,
  pub answer: Answer,
  pub status: String,
}

// Predictions
// ===========

#[derive(Debug, Deserialize)]
pub struct PredictionParams {
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub district: String,
}

// Status
// ======

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  pub predictions_loaded: usize,
  pub started_at: DateTime<Utc>,
  pub uptime_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
  pub version: String,
}

// Errors
// ======

/// Generic error body; `status` is present on endpoints that also report success with one
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub status: Option<String>,
}

impl ErrorResponse {
  pub fn new(message: impl Into<String>) -> Self {
    Self { error: message.into(), status: None }
  }

  pub fn with_status(message: impl Into<String>) -> Self {
    Self { error: message.into(), status: Some("error".to_string()) }
  }
}

impl IntoResponse for ErrorResponse {
  fn into_response(self) -> Response {
    Json(self).into_response()
  }
}
