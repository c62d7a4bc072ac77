//! Text embedding provider
//!
//! Embeddings are computed by an external service speaking the
//! OpenAI-compatible `POST {base}/embeddings` contract (a hosted API or a
//! local sentence-transformers server).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maps text to fixed-length vectors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  /// Embed every input, preserving order
  async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

  /// Embed a single text
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let mut vectors = self.embed_batch(&[text.to_string()]).await?;
    vectors.pop().context("embedding service returned no vector")
  }
}

/// Embeddings client for OpenAI-compatible endpoints
#[derive(Clone)]
pub struct HttpEmbedder {
  client: Client,
  endpoint: String,
  model: String,
}

impl HttpEmbedder {
  pub fn new(base_url: &str, model: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
    anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");

    let mut headers = HeaderMap::new();
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
      headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {key}")).context("invalid embedding API key")?,
      );
    }
    let client = Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .context("failed to build embedding HTTP client")?;

    Ok(Self {
      client,
      endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
      model: model.to_string(),
    })
  }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
  async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
    if inputs.is_empty() {
      return Ok(Vec::new());
    }

    let request = EmbeddingRequest { model: &self.model, input: inputs };
    let response = self.client.post(&self.endpoint).json(&request).send().await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      anyhow::bail!("embeddings request failed ({status}): {body}");
    }

    let mut parsed: EmbeddingResponse =
      response.json().await.context("failed to parse embedding response")?;
    parsed.data.sort_by_key(|entry| entry.index);
    anyhow::ensure!(
      parsed.data.len() == inputs.len(),
      "embedding service returned {} vectors for {} inputs",
      parsed.data.len(),
      inputs.len()
    );
    tracing::debug!("Embedded {} inputs with {}", inputs.len(), self.model);

    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
  }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
  index: usize,
}
