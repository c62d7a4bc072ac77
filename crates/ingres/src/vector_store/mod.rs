//! Vector store abstraction
//!
//! The store keeps `(id, document, embedding, metadata)` entries grouped into
//! named collections and answers nearest-neighbour queries. Chroma is the
//! production backend; the in-memory store backs tests and offline runs.

pub mod chroma;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::records::Metadata;

pub use chroma::ChromaStore;
pub use memory::MemoryStore;

/// One stored entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
  pub id: String,
  pub document: String,
  pub embedding: Vec<f32>,
  pub metadata: Metadata,
}

/// A query hit, best match first
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
  pub id: String,
  pub document: String,
  /// Distance from the query, lower is closer
  pub distance: Option<f32>,
}

/// A stored entry without its vector, for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct PeekedDocument {
  pub id: String,
  pub document: String,
  pub metadata: Metadata,
}

/// Collection-oriented vector store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Remove a collection and everything in it
  async fn delete_collection(&self, name: &str) -> Result<()>;

  /// Make sure a collection exists
  async fn get_or_create_collection(&self, name: &str) -> Result<()>;

  /// Append documents to a collection
  async fn add(&self, collection: &str, documents: &[StoredDocument]) -> Result<()>;

  /// Up to `n_results` nearest documents, best first
  async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>>;

  /// Number of entries in a collection
  async fn count(&self, collection: &str) -> Result<usize>;

  /// First `limit` entries of a collection
  async fn peek(&self, collection: &str, limit: usize) -> Result<Vec<PeekedDocument>>;
}
