//! Text generation provider (hosted LLM)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns a prompt into response text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationProvider: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
  client: Client,
  base_url: String,
  model: String,
  api_key: String,
}

impl GeminiClient {
  pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build().context("failed to build Gemini HTTP client")?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.to_string(),
      api_key: api_key.to_string(),
    })
  }

  fn endpoint(&self) -> String {
    format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
  async fn generate(&self, prompt: &str) -> Result<String> {
    anyhow::ensure!(!self.api_key.trim().is_empty(), "GEMINI_API_KEY is not set");

    let request = GenerateContentRequest { contents: vec![Content { parts: vec![Part { text: Some(prompt) }] }] };
    let response = self
      .client
      .post(self.endpoint())
      .query(&[("key", self.api_key.as_str())])
      .json(&request)
      .send()
      .await
      .context("Gemini request failed")?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      anyhow::bail!("Gemini generateContent failed ({status}): {body}");
    }

    let body: GenerateContentResponse = response.json().await.context("failed to parse Gemini response")?;
    let text = body
      .candidates
      .into_iter()
      .next()
      .and_then(|candidate| candidate.content)
      .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
      .context("no text content found in Gemini response")?;

    tracing::info!("Generated response from {} ({} chars)", self.model, text.len());
    Ok(text)
  }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
  contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
  parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
  text: Option<String>,
}
