//! Error types for the steps whose callers branch on the failure kind.
//!
//! Glue code elsewhere returns `anyhow::Result`.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a spreadsheet into a [`crate::spreadsheet::Sheet`]
#[derive(Debug, Error)]
pub enum SheetError {
  #[error("failed to open {path}: {message}")]
  Open { path: PathBuf, message: String },

  #[error("unsupported spreadsheet format: {0}")]
  UnsupportedFormat(String),

  #[error("{path} has no worksheet")]
  NoWorksheet { path: PathBuf },

  #[error("header row {row} is missing from {path}")]
  MissingHeader { path: PathBuf, row: usize },

  #[error("failed to parse CSV: {0}")]
  Csv(#[from] csv::Error),
}

/// Failures that abort an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
  #[error(transparent)]
  Sheet(#[from] SheetError),

  #[error("missing required columns: {}", .0.join(", "))]
  MissingColumns(Vec<String>),

  #[error("failed to embed batch starting at row {row}: {source}")]
  Embedding {
    row: usize,
    inserted: usize,
    #[source]
    source: anyhow::Error,
  },

  #[error("failed to store batch in {collection} after {inserted} rows: {source}")]
  Insert {
    collection: String,
    inserted: usize,
    #[source]
    source: anyhow::Error,
  },

  #[error("failed to prepare collection {collection}: {source}")]
  Collection {
    collection: String,
    inserted: usize,
    #[source]
    source: anyhow::Error,
  },
}

impl IngestError {
  /// Rows that reached the store before the run stopped
  pub fn inserted(&self) -> usize {
    match self {
      IngestError::Insert { inserted, .. }
      | IngestError::Embedding { inserted, .. }
      | IngestError::Collection { inserted, .. } => *inserted,
      _ => 0,
    }
  }
}
