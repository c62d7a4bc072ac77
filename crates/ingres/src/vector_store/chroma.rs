//! Chroma REST (v2) backend
//!
//! Collections are addressed by name on create/delete and by server-assigned
//! id for everything else; resolved ids are cached per client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{PeekedDocument, QueryMatch, StoredDocument, VectorStore};
use crate::records::Metadata;

const TOKEN_HEADER: &str = "x-chroma-token";

/// Connection settings for a Chroma server or Chroma Cloud
#[derive(Debug, Clone)]
pub struct ChromaConfig {
  pub url: String,
  pub tenant: String,
  pub database: String,
  pub api_key: Option<String>,
  pub timeout: Duration,
}

pub struct ChromaStore {
  client: Client,
  collections_url: String,
  ids: Mutex<HashMap<String, String>>,
}

impl ChromaStore {
  pub fn new(config: &ChromaConfig) -> Result<Self> {
    let mut headers = HeaderMap::new();
    if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
      headers.insert(TOKEN_HEADER, HeaderValue::from_str(key).context("invalid Chroma API key")?);
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .default_headers(headers)
      .build()
      .context("failed to build Chroma HTTP client")?;

    let collections_url = format!(
      "{}/api/v2/tenants/{}/databases/{}/collections",
      config.url.trim_end_matches('/'),
      config.tenant,
      config.database
    );
    tracing::debug!("Chroma collections endpoint: {collections_url}");

    Ok(Self { client, collections_url, ids: Mutex::new(HashMap::new()) })
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let url = if path.is_empty() {
      self.collections_url.clone()
    } else {
      format!("{}/{}", self.collections_url, path)
    };
    self.client.request(method, url)
  }

  async fn send(request: RequestBuilder, action: &str) -> Result<reqwest::Response> {
    let response = request.send().await.with_context(|| format!("Chroma {action} request failed"))?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      anyhow::bail!("Chroma {action} failed ({status}): {body}");
    }
    Ok(response)
  }

  /// Server id for `name`, creating the collection on first use
  async fn collection_id(&self, name: &str) -> Result<String> {
    if let Some(id) = self.ids.lock().await.get(name) {
      return Ok(id.clone());
    }

    let response = Self::send(
      self.request(Method::POST, "").json(&json!({ "name": name, "get_or_create": true })),
      "get_or_create_collection",
    )
    .await?;
    let collection: CollectionModel =
      response.json().await.context("failed to parse Chroma collection response")?;

    self.ids.lock().await.insert(name.to_string(), collection.id.clone());
    Ok(collection.id)
  }

  /// A failed request on a cached id drops the cache entry, so the next call
  /// resolves the name again
  async fn forget_on_error<T>(&self, name: &str, result: Result<T>) -> Result<T> {
    if result.is_err() && self.ids.lock().await.remove(name).is_some() {
      tracing::debug!("Dropped cached id for collection {name}");
    }
    result
  }
}

#[async_trait]
impl VectorStore for ChromaStore {
  async fn delete_collection(&self, name: &str) -> Result<()> {
    self.ids.lock().await.remove(name);
    Self::send(self.request(Method::DELETE, name), "delete_collection").await?;
    Ok(())
  }

  async fn get_or_create_collection(&self, name: &str) -> Result<()> {
    self.collection_id(name).await.map(|_| ())
  }

  async fn add(&self, collection: &str, documents: &[StoredDocument]) -> Result<()> {
    if documents.is_empty() {
      return Ok(());
    }
    let id = self.collection_id(collection).await?;
    let request = AddRequest {
      ids: documents.iter().map(|d| d.id.as_str()).collect(),
      embeddings: documents.iter().map(|d| d.embedding.as_slice()).collect(),
      documents: documents.iter().map(|d| d.document.as_str()).collect(),
      metadatas: documents.iter().map(|d| &d.metadata).collect(),
    };
    let result = Self::send(self.request(Method::POST, &format!("{id}/add")).json(&request), "add").await;
    self.forget_on_error(collection, result).await.map(|_| ())
  }

  async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>> {
    let id = self.collection_id(collection).await?;
    let body = json!({
      "query_embeddings": [embedding],
      "n_results": n_results,
      "include": ["documents", "distances"],
    });
    let result = Self::send(self.request(Method::POST, &format!("{id}/query")).json(&body), "query").await;
    let response = self.forget_on_error(collection, result).await?;
    let parsed: QueryResponse = response.json().await.context("failed to parse Chroma query response")?;

    let ids = parsed.ids.into_iter().next().unwrap_or_default();
    let documents = parsed.documents.and_then(|d| d.into_iter().next()).unwrap_or_default();
    let distances = parsed.distances.and_then(|d| d.into_iter().next()).unwrap_or_default();

    Ok(
      ids
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
          // entries stored without a document contribute nothing to context
          let document = documents.get(i).cloned().flatten()?;
          Some(QueryMatch { id, document, distance: distances.get(i).copied().flatten() })
        })
        .collect(),
    )
  }

  async fn count(&self, collection: &str) -> Result<usize> {
    let id = self.collection_id(collection).await?;
    let result = Self::send(self.request(Method::GET, &format!("{id}/count")), "count").await;
    let response = self.forget_on_error(collection, result).await?;
    response.json().await.context("failed to parse Chroma count response")
  }

  async fn peek(&self, collection: &str, limit: usize) -> Result<Vec<PeekedDocument>> {
    let id = self.collection_id(collection).await?;
    let body = json!({ "limit": limit, "include": ["documents", "metadatas"] });
    let result = Self::send(self.request(Method::POST, &format!("{id}/get")).json(&body), "get").await;
    let response = self.forget_on_error(collection, result).await?;
    let parsed: GetResponse = response.json().await.context("failed to parse Chroma get response")?;

    let documents = parsed.documents.unwrap_or_default();
    let metadatas = parsed.metadatas.unwrap_or_default();
    Ok(
      parsed
        .ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| PeekedDocument {
          id,
          document: documents.get(i).cloned().flatten().unwrap_or_default(),
          metadata: metadatas.get(i).cloned().flatten().unwrap_or_default(),
        })
        .collect(),
    )
  }
}

#[derive(Debug, Deserialize)]
struct CollectionModel {
  id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
  ids: Vec<&'a str>,
  embeddings: Vec<&'a [f32]>,
  documents: Vec<&'a str>,
  metadatas: Vec<&'a Metadata>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
  ids: Vec<Vec<String>>,
  #[serde(default)]
  documents: Option<Vec<Vec<Option<String>>>>,
  #[serde(default)]
  distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
  ids: Vec<String>,
  #[serde(default)]
  documents: Option<Vec<Option<String>>>,
  #[serde(default)]
  metadatas: Option<Vec<Option<Metadata>>>,
}
