//! HTTP client for a running assistant server
//!
//! Used by `ingres check` to smoke-test a deployment the way the frontend
//! talks to it.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

use crate::server::types::{AskResponse, StatusResponse};

/// Configuration for the assistant HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the server (e.g., "http://127.0.0.1:8000")
  pub base_url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: "http://127.0.0.1:8000".to_string(), timeout_secs: 120 }
  }
}

pub struct IngresClient {
  client: Client,
  config: ClientConfig,
}

impl IngresClient {
  pub fn with_config(config: ClientConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("Failed to create HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// GET /status
  pub async fn status(&self) -> Result<StatusResponse> {
    let response =
      timeout(Duration::from_secs(self.config.timeout_secs), self.client.get(self.url("/status")).send())
        .await??;

    if !response.status().is_success() {
      let error_text = response.text().await?;
      return Err(anyhow!("Status check failed: {}", error_text));
    }
    Ok(response.json().await?)
  }

  /// GET /ask
  pub async fn ask(&self, query: &str, persona: &str, language: &str) -> Result<AskResponse> {
    let request =
      self.client.get(self.url("/ask")).query(&[("query", query), ("persona", persona), ("language", language)]);
    let response = timeout(Duration::from_secs(self.config.timeout_secs), request.send()).await??;

    if !response.status().is_success() {
      let error_text = response.text().await?;
      return Err(anyhow!("Ask failed: {}", error_text));
    }
    Ok(response.json().await?)
  }
}
