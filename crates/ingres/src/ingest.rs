//! Spreadsheet ingestion into the vector store
//!
//! Each run rebuilds its target collections from scratch: the collection is
//! dropped (best effort), recreated, and filled batch by batch. A failed
//! batch stops the run; rows already stored stay stored.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::embeddings::EmbeddingProvider;
use crate::errors::IngestError;
use crate::records::{build_records, GroundwaterRecord, SentenceTemplate};
use crate::spreadsheet::Sheet;
use crate::states::CollectionLayout;
use crate::vector_store::{StoredDocument, VectorStore};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct IngestOptions {
  pub layout: CollectionLayout,
  pub template: SentenceTemplate,
  pub batch_size: usize,
  pub header_row: usize,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub rows: usize,
  pub inserted: usize,
  pub collections: Vec<String>,
}

pub struct Ingestor {
  embedder: Arc<dyn EmbeddingProvider>,
  store: Arc<dyn VectorStore>,
  options: IngestOptions,
}

impl Ingestor {
  pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>, options: IngestOptions) -> Self {
    Self { embedder, store, options }
  }

  /// Read `path` and ingest every row
  pub async fn ingest(&self, path: &Path) -> Result<IngestReport, IngestError> {
    info!("Running ingestion with file {}", path.display());
    let sheet = Sheet::from_path(path, self.options.header_row).map_err(|e| {
      error!("Error reading spreadsheet {}: {e}", path.display());
      IngestError::from(e)
    })?;
    info!("Loaded {} rows from {}", sheet.len(), path.display());
    self.ingest_sheet(&sheet).await
  }

  pub async fn ingest_sheet(&self, sheet: &Sheet) -> Result<IngestReport, IngestError> {
    let missing = sheet.missing_columns(self.options.template.required_columns());
    if !missing.is_empty() {
      error!("Spreadsheet is missing required columns: {}", missing.join(", "));
      return Err(IngestError::MissingColumns(missing));
    }

    let records = build_records(sheet, self.options.template);
    let groups = self.group_by_collection(records);
    let mut report = IngestReport { rows: sheet.len(), inserted: 0, collections: Vec::new() };

    for (collection, records) in groups {
      self.reset_collection(&collection, report.inserted).await?;
      report.inserted += self.insert_batches(&collection, &records, report.inserted).await?;
      report.collections.push(collection);
    }

    info!(
      "Ingestion completed: {} of {} rows stored in {} collection(s)",
      report.inserted,
      report.rows,
      report.collections.len()
    );
    Ok(report)
  }

  /// Split records by target collection, keeping first-seen order
  fn group_by_collection(&self, records: Vec<GroundwaterRecord>) -> Vec<(String, Vec<GroundwaterRecord>)> {
    let mut groups: Vec<(String, Vec<GroundwaterRecord>)> = Vec::new();
    for record in records {
      let collection = self.options.layout.collection_for_state(&record.state);
      match groups.iter_mut().find(|(name, _)| *name == collection) {
        Some((_, members)) => members.push(record),
        None => groups.push((collection, vec![record])),
      }
    }
    groups
  }

  async fn reset_collection(&self, collection: &str, inserted: usize) -> Result<(), IngestError> {
    match self.store.delete_collection(collection).await {
      Ok(()) => info!("Deleted existing collection {collection}"),
      Err(e) => info!("Could not delete collection {collection} (may not exist): {e:#}"),
    }
    self.store.get_or_create_collection(collection).await.map_err(|source| {
      error!("Failed to create collection {collection}: {source:#}");
      IngestError::Collection { collection: collection.to_string(), inserted, source }
    })
  }

  /// Embed and store `records`; returns how many were stored
  async fn insert_batches(
    &self,
    collection: &str,
    records: &[GroundwaterRecord],
    already_inserted: usize,
  ) -> Result<usize, IngestError> {
    let batch_size = self.options.batch_size.max(1);
    let mut inserted = 0;

    for (batch_index, batch) in records.chunks(batch_size).enumerate() {
      let first_row = batch_index * batch_size;
      let texts: Vec<String> = batch.iter().map(|record| record.text.clone()).collect();

      let embeddings = self.embedder.embed_batch(&texts).await.map_err(|source| {
        error!("Embedding failed for rows starting at {first_row} in {collection}: {source:#}");
        IngestError::Embedding { row: first_row, inserted: already_inserted + inserted, source }
      })?;
      if embeddings.len() != batch.len() {
        error!("Embedding service returned {} vectors for {} rows in {collection}", embeddings.len(), batch.len());
        return Err(IngestError::Embedding {
          row: first_row,
          inserted: already_inserted + inserted,
          source: anyhow::anyhow!("embedding service returned {} vectors for {} rows", embeddings.len(), batch.len()),
        });
      }

      let documents: Vec<StoredDocument> = batch
        .iter()
        .zip(embeddings)
        .map(|(record, embedding)| StoredDocument {
          id: record.id.clone(),
          document: record.text.clone(),
          embedding,
          metadata: record.metadata.clone(),
        })
        .collect();

      self.store.add(collection, &documents).await.map_err(|source| {
        error!("Failed to insert rows starting at {first_row} into {collection}: {source:#}");
        IngestError::Insert {
          collection: collection.to_string(),
          inserted: already_inserted + inserted,
          source,
        }
      })?;

      inserted += documents.len();
      info!("Inserted {}/{} rows into {collection}", inserted, records.len());
    }

    Ok(inserted)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::MockEmbeddingProvider;
  use crate::states::LayoutKind;
  use crate::vector_store::MockVectorStore;
  use mockall::predicate::*;

  const CSV: &str = "State,District,Year,Rainfall(Total),Rainfall Recharge,Groundwater Recharge (ham),\
Surface Water Irrigation,Ground Water Irrigation,Fresh Total Ground Water Avialable,Saline Ground Water Avialable
Goa,North Goa,2020,3200,410,530,12,44,1200,0
Goa,South Goa,2020,3100,400,520,11,40,1100,0
Kerala,Idukki,2020,2900,380,500,10,40,1000,0
";

  fn sheet() -> Sheet {
    Sheet::from_csv_reader(CSV.as_bytes(), 0).unwrap().unwrap()
  }

  fn options(kind: LayoutKind, batch_size: usize) -> IngestOptions {
    IngestOptions {
      layout: CollectionLayout::new(kind, "ingres_groundwater", "ingres_"),
      template: SentenceTemplate::Detailed,
      batch_size,
      header_row: 0,
    }
  }

  fn embedder() -> MockEmbeddingProvider {
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed_batch().returning(|texts| Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect()));
    embedder
  }

  #[tokio::test]
  async fn test_missing_columns_touch_nothing() {
    let sheet = Sheet::from_csv_reader("State,District\nGoa,North Goa\n".as_bytes(), 0).unwrap().unwrap();
    let mut store = MockVectorStore::new();
    store.expect_delete_collection().never();
    store.expect_get_or_create_collection().never();
    store.expect_add().never();

    let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), options(LayoutKind::Shared, 100));
    let err = ingestor.ingest_sheet(&sheet).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingColumns(ref cols) if cols.contains(&"Year".to_string())));
    assert_eq!(err.inserted(), 0);
  }

  #[tokio::test]
  async fn test_batches_and_ignored_delete_failure() {
    let mut store = MockVectorStore::new();
    store.expect_delete_collection().returning(|_| Err(anyhow::anyhow!("no such collection")));
    store.expect_get_or_create_collection().with(eq("ingres_groundwater")).times(1).returning(|_| Ok(()));
    store.expect_add().times(2).returning(|_, _| Ok(()));

    let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), options(LayoutKind::Shared, 2));
    let report = ingestor.ingest_sheet(&sheet()).await.unwrap();
    assert_eq!(report, IngestReport { rows: 3, inserted: 3, collections: vec!["ingres_groundwater".to_string()] });
  }

  #[tokio::test]
  async fn test_per_state_layout_splits_collections() {
    let mut store = MockVectorStore::new();
    store.expect_delete_collection().returning(|_| Ok(()));
    store.expect_get_or_create_collection().returning(|_| Ok(()));
    store
      .expect_add()
      .withf(|collection: &str, docs: &[StoredDocument]| collection == "ingres_GOA" && docs.len() == 2)
      .times(1)
      .returning(|_, _| Ok(()));
    store
      .expect_add()
      .withf(|collection: &str, docs: &[StoredDocument]| collection == "ingres_KERALA" && docs.len() == 1)
      .times(1)
      .returning(|_, _| Ok(()));

    let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), options(LayoutKind::PerState, 100));
    let report = ingestor.ingest_sheet(&sheet()).await.unwrap();
    assert_eq!(report.collections, vec!["ingres_GOA", "ingres_KERALA"]);
    assert_eq!(report.inserted, 3);
  }

  #[tokio::test]
  async fn test_failed_batch_reports_rows_already_stored() {
    let mut store = MockVectorStore::new();
    store.expect_delete_collection().returning(|_| Ok(()));
    store.expect_get_or_create_collection().returning(|_| Ok(()));
    let mut calls = 0;
    store.expect_add().returning(move |_, _| {
      calls += 1;
      if calls == 1 {
        Ok(())
      } else {
        Err(anyhow::anyhow!("quota exceeded"))
      }
    });

    let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), options(LayoutKind::Shared, 2));
    let err = ingestor.ingest_sheet(&sheet()).await.unwrap_err();
    assert!(matches!(err, IngestError::Insert { .. }));
    assert_eq!(err.inserted(), 2);
  }

  #[tokio::test]
  async fn test_short_embedding_response_stops_the_run() {
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed_batch().returning(|texts| Ok(texts.iter().skip(1).map(|_| vec![0.5, 0.5]).collect()));
    let mut store = MockVectorStore::new();
    store.expect_delete_collection().returning(|_| Ok(()));
    store.expect_get_or_create_collection().returning(|_| Ok(()));
    store.expect_add().never();

    let ingestor = Ingestor::new(Arc::new(embedder), Arc::new(store), options(LayoutKind::Shared, 2));
    let err = ingestor.ingest_sheet(&sheet()).await.unwrap_err();
    assert!(matches!(err, IngestError::Embedding { row: 0, .. }));
    assert_eq!(err.inserted(), 0);
    assert!(err.to_string().contains("1 vectors for 2 rows"));
  }
}
