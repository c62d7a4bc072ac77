//! Machine translation provider

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Translates text into a target language code (`en`, `hi`, ...)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
  async fn translate(&self, text: &str, target: &str) -> Result<String>;
}

/// Google Cloud Translation v2 client
pub struct GoogleTranslator {
  client: Client,
  endpoint: String,
  api_key: String,
}

impl GoogleTranslator {
  pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
    let client =
      Client::builder().timeout(timeout).build().context("failed to build translation HTTP client")?;
    Ok(Self {
      client,
      endpoint: format!("{}/language/translate/v2", base_url.trim_end_matches('/')),
      api_key: api_key.to_string(),
    })
  }
}

#[async_trait]
impl Translator for GoogleTranslator {
  async fn translate(&self, text: &str, target: &str) -> Result<String> {
    let response = self
      .client
      .post(&self.endpoint)
      .query(&[("key", self.api_key.as_str())])
      .json(&json!({ "q": text, "target": target, "format": "text" }))
      .send()
      .await
      .context("translation request failed")?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      anyhow::bail!("translation failed ({status}): {body}");
    }

    let parsed: TranslateResponse = response.json().await.context("failed to parse translation response")?;
    parsed
      .data
      .translations
      .into_iter()
      .next()
      .map(|t| t.translated_text)
      .context("translation response contained no translations")
  }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
  data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
  translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
  translated_text: String,
}
