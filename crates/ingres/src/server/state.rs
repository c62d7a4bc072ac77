//! Shared handles injected into every handler

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::ingest::Ingestor;
use crate::pipeline::QueryPipeline;
use crate::predictions::PredictionTable;
use crate::voice::VoiceProcessor;

#[derive(Clone)]
pub struct AppState {
  pub pipeline: Arc<QueryPipeline>,
  pub ingestor: Arc<Ingestor>,
  pub voice: Arc<VoiceProcessor>,
  pub predictions: Arc<PredictionTable>,
  /// Spreadsheet ingested when `/ingres` receives no upload
  pub data_file: PathBuf,
  /// Where uploaded spreadsheets are staged
  pub upload_dir: PathBuf,
  pub started_at: DateTime<Utc>,
}

impl AppState {
  pub fn new(
    pipeline: QueryPipeline,
    ingestor: Ingestor,
    voice: VoiceProcessor,
    predictions: PredictionTable,
    data_file: PathBuf,
    upload_dir: PathBuf,
  ) -> Self {
    Self {
      pipeline: Arc::new(pipeline),
      ingestor: Arc::new(ingestor),
      voice: Arc::new(voice),
      predictions: Arc::new(predictions),
      data_file,
      upload_dir,
      started_at: Utc::now(),
    }
  }
}
