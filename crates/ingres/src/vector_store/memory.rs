//! In-process vector store using brute-force cosine similarity

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{PeekedDocument, QueryMatch, StoredDocument, VectorStore};

/// Collections held in memory; contents are lost on drop
#[derive(Default)]
pub struct MemoryStore {
  collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Names of the existing collections, sorted
  pub async fn collection_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
    names.sort();
    names
  }
}

/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    0.0
  } else {
    dot_product / (magnitude_a * magnitude_b)
  }
}

#[async_trait]
impl VectorStore for MemoryStore {
  async fn delete_collection(&self, name: &str) -> Result<()> {
    self
      .collections
      .write()
      .await
      .remove(name)
      .map(|_| ())
      .ok_or_else(|| anyhow!("collection {name} does not exist"))
  }

  async fn get_or_create_collection(&self, name: &str) -> Result<()> {
    self.collections.write().await.entry(name.to_string()).or_default();
    Ok(())
  }

  async fn add(&self, collection: &str, documents: &[StoredDocument]) -> Result<()> {
    let mut collections = self.collections.write().await;
    let entries =
      collections.get_mut(collection).ok_or_else(|| anyhow!("collection {collection} does not exist"))?;

    for document in documents {
      // ids are unique within a collection; a repeated id replaces the entry
      match entries.iter_mut().find(|existing| existing.id == document.id) {
        Some(existing) => *existing = document.clone(),
        None => entries.push(document.clone()),
      }
    }
    Ok(())
  }

  async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>> {
    let collections = self.collections.read().await;
    let entries =
      collections.get(collection).ok_or_else(|| anyhow!("collection {collection} does not exist"))?;

    let mut scored: Vec<(f32, &StoredDocument)> =
      entries.iter().map(|doc| (1.0 - cosine_similarity(embedding, &doc.embedding), doc)).collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    Ok(
      scored
        .into_iter()
        .take(n_results)
        .map(|(distance, doc)| QueryMatch {
          id: doc.id.clone(),
          document: doc.document.clone(),
          distance: Some(distance),
        })
        .collect(),
    )
  }

  async fn count(&self, collection: &str) -> Result<usize> {
    let collections = self.collections.read().await;
    collections.get(collection).map(Vec::len).ok_or_else(|| anyhow!("collection {collection} does not exist"))
  }

  async fn peek(&self, collection: &str, limit: usize) -> Result<Vec<PeekedDocument>> {
    let collections = self.collections.read().await;
    let entries =
      collections.get(collection).ok_or_else(|| anyhow!("collection {collection} does not exist"))?;
    Ok(
      entries
        .iter()
        .take(limit)
        .map(|doc| PeekedDocument {
          id: doc.id.clone(),
          document: doc.document.clone(),
          metadata: doc.metadata.clone(),
        })
        .collect(),
    )
  }
}
