//! Request context and middleware
//!
//! Every request gets a context with a unique id that handlers pick up from
//! the request extensions, so their log lines can be correlated with the
//! start/complete lines written here.

use axum::{
  extract::Request,
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Request metadata shared with handlers
#[derive(Clone, Debug)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub user_agent: String,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, user_agent: String) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, user_agent }
  }

  fn prefix(&self) -> String {
    format!("[{}] {} {}", self.request_id, self.method, self.uri.path())
  }

  pub fn log_info(&self, message: &str) {
    tracing::info!("{} - {message}", self.prefix());
  }

  pub fn log_warn(&self, message: &str) {
    tracing::warn!("{} - {message}", self.prefix());
  }

  pub fn log_error(&self, message: &str) {
    tracing::error!("{} - {message}", self.prefix());
  }

  pub fn log_request_start(&self) {
    tracing::info!("{} - Request started (User-Agent: {})", self.prefix(), self.user_agent);
  }

  pub fn log_request_complete(&self, status_code: u16, duration_ms: f64) {
    tracing::info!("{} - Request completed (Status: {status_code}, Duration: {duration_ms:.2}ms)", self.prefix());
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let user_agent = request
    .headers()
    .get("user-agent")
    .and_then(|v| v.to_str().ok())
    .unwrap_or("none")
    .to_string();
  let context = RequestContext::new(request.method().clone(), request.uri().clone(), user_agent);

  let start_time = Instant::now();
  context.log_request_start();
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  context.log_request_complete(response.status().as_u16(), duration_ms);
  response
}
