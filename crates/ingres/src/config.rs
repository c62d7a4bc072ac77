//! Runtime configuration
//!
//! Every setting is a command-line flag that falls back to an environment
//! variable; a local `.env` file is read first via [`load_env`]. Missing
//! credentials never stop start-up: the affected upstream call fails at
//! request time and the caller degrades.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::embeddings::HttpEmbedder;
use crate::forecast::{ForecastOptions, DEFAULT_PERIODS};
use crate::generation::GeminiClient;
use crate::ingest::{IngestOptions, Ingestor};
use crate::pipeline::{PipelineOptions, QueryPipeline};
use crate::records::SentenceTemplate;
use crate::states::{CollectionLayout, LayoutKind};
use crate::translation::GoogleTranslator;
use crate::vector_store::chroma::{ChromaConfig, ChromaStore};
use crate::voice::{VoiceOptions, VoiceProcessor, WhisperTranscriber};

/// Load `.env` from the working directory (or a parent) if present
pub fn load_env() -> Option<PathBuf> {
  dotenvy::dotenv().ok()
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
  /// Chroma server URL
  #[arg(long, env = "CHROMA_URL", default_value = "https://api.trychroma.com")]
  pub chroma_url: String,

  /// Chroma API token
  #[arg(long, env = "CHROMA_API_KEY", hide_env_values = true)]
  pub chroma_api_key: Option<String>,

  /// Chroma tenant
  #[arg(long, env = "CHROMA_TENANT", default_value = "default_tenant")]
  pub chroma_tenant: String,

  /// Chroma database
  #[arg(long, env = "CHROMA_DATABASE", default_value = "default_database")]
  pub chroma_database: String,

  /// Gemini API key
  #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
  pub gemini_api_key: String,

  /// Gemini model name
  #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
  pub gemini_model: String,

  /// Gemini API base URL
  #[arg(long, env = "GEMINI_URL", default_value = "https://generativelanguage.googleapis.com")]
  pub gemini_url: String,

  /// OpenAI-compatible embeddings base URL
  #[arg(long, env = "EMBEDDING_URL", default_value = "http://127.0.0.1:8080/v1")]
  pub embedding_url: String,

  /// Embedding model name
  #[arg(long, env = "EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2")]
  pub embedding_model: String,

  /// Embeddings API key
  #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
  pub embedding_api_key: Option<String>,

  /// Google Translation API key; translation is disabled when unset
  #[arg(long, env = "TRANSLATE_API_KEY", hide_env_values = true)]
  pub translate_api_key: Option<String>,

  /// Google Translation API base URL
  #[arg(long, env = "TRANSLATE_URL", default_value = "https://translation.googleapis.com")]
  pub translate_url: String,

  /// OpenAI-compatible transcription base URL
  #[arg(long, env = "WHISPER_URL", default_value = "https://api.openai.com/v1")]
  pub whisper_url: String,

  /// Transcription model name
  #[arg(long, env = "WHISPER_MODEL", default_value = "whisper-1")]
  pub whisper_model: String,

  /// Transcription API key
  #[arg(long, env = "WHISPER_API_KEY", hide_env_values = true)]
  pub whisper_api_key: Option<String>,

  /// Collection layout shared by ingestion and queries
  #[arg(long, env = "INGRES_COLLECTION_LAYOUT", value_enum, default_value_t = LayoutKind::Shared)]
  pub collection_layout: LayoutKind,

  /// Collection name for the shared layout
  #[arg(long, env = "INGRES_COLLECTION", default_value = "ingres_groundwater")]
  pub collection: String,

  /// Collection name prefix for the per-state layout
  #[arg(long, env = "INGRES_COLLECTION_PREFIX", default_value = "ingres_")]
  pub collection_prefix: String,

  /// Documents retrieved per collection for each query
  #[arg(long, env = "INGRES_N_RESULTS", default_value_t = crate::pipeline::DEFAULT_N_RESULTS)]
  pub n_results: usize,

  /// Rows embedded and stored per request during ingestion
  #[arg(long, env = "INGRES_BATCH_SIZE", default_value_t = crate::ingest::DEFAULT_BATCH_SIZE)]
  pub batch_size: usize,

  /// Sentence layout used for ingested rows
  #[arg(long, env = "INGRES_TEMPLATE", value_enum, default_value_t = SentenceTemplate::Detailed)]
  pub template: SentenceTemplate,

  /// Zero-based row holding the spreadsheet headers
  #[arg(long, env = "INGRES_HEADER_ROW", default_value_t = 0)]
  pub header_row: usize,

  /// Default spreadsheet for ingestion and forecasting
  #[arg(long, env = "INGRES_DATA_FILE", default_value = "groundwater.xlsx")]
  pub data_file: PathBuf,

  /// Forecast CSV served by the analytics endpoints
  #[arg(long, env = "INGRES_PREDICTIONS", default_value = "all_predictions.csv")]
  pub predictions: PathBuf,

  /// ffmpeg binary used to decode compressed audio
  #[arg(long, env = "INGRES_FFMPEG", default_value = "ffmpeg")]
  pub ffmpeg: String,

  /// Directory for temporary upload and audio files
  #[arg(long, env = "INGRES_TEMP_DIR", default_value = "temp_audio")]
  pub temp_dir: PathBuf,

  /// Timeout for upstream HTTP calls, in seconds
  #[arg(long, env = "INGRES_HTTP_TIMEOUT_SECS", default_value_t = 120)]
  pub http_timeout_secs: u64,
}

impl Settings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.http_timeout_secs)
  }

  pub fn layout(&self) -> CollectionLayout {
    CollectionLayout::new(self.collection_layout, &self.collection, &self.collection_prefix)
  }

  pub fn pipeline_options(&self) -> PipelineOptions {
    PipelineOptions { layout: self.layout(), n_results: self.n_results }
  }

  pub fn ingest_options(&self) -> IngestOptions {
    IngestOptions {
      layout: self.layout(),
      template: self.template,
      batch_size: self.batch_size,
      header_row: self.header_row,
    }
  }

  pub fn voice_options(&self) -> VoiceOptions {
    VoiceOptions { temp_dir: self.temp_dir.clone(), ffmpeg: self.ffmpeg.clone() }
  }

  pub fn forecast_options(&self, workers: Option<usize>, periods: Option<usize>) -> ForecastOptions {
    let defaults = ForecastOptions::default();
    ForecastOptions {
      periods: periods.unwrap_or(DEFAULT_PERIODS),
      workers: workers.unwrap_or(defaults.workers),
    }
  }

  pub fn embedder(&self) -> Result<HttpEmbedder> {
    HttpEmbedder::new(&self.embedding_url, &self.embedding_model, self.embedding_api_key.as_deref(), self.timeout())
  }

  pub fn vector_store(&self) -> Result<ChromaStore> {
    ChromaStore::new(&ChromaConfig {
      url: self.chroma_url.clone(),
      tenant: self.chroma_tenant.clone(),
      database: self.chroma_database.clone(),
      api_key: self.chroma_api_key.clone(),
      timeout: self.timeout(),
    })
  }

  pub fn generator(&self) -> Result<GeminiClient> {
    GeminiClient::new(&self.gemini_url, &self.gemini_model, &self.gemini_api_key, self.timeout())
  }

  pub fn translator(&self) -> Result<Option<GoogleTranslator>> {
    match self.translate_api_key.as_deref().filter(|key| !key.trim().is_empty()) {
      Some(key) => Ok(Some(GoogleTranslator::new(&self.translate_url, key, self.timeout())?)),
      None => Ok(None),
    }
  }

  pub fn transcriber(&self) -> Result<WhisperTranscriber> {
    WhisperTranscriber::new(&self.whisper_url, &self.whisper_model, self.whisper_api_key.as_deref(), self.timeout())
  }

  /// Query pipeline against the configured upstream services
  pub fn pipeline(&self, store: Arc<ChromaStore>) -> Result<QueryPipeline> {
    let pipeline =
      QueryPipeline::new(Arc::new(self.embedder()?), store, Arc::new(self.generator()?), self.pipeline_options());
    Ok(match self.translator()? {
      Some(translator) => pipeline.with_translator(Arc::new(translator)),
      None => {
        tracing::info!("TRANSLATE_API_KEY not set, query and answer translation disabled");
        pipeline
      }
    })
  }

  pub fn ingestor(&self, store: Arc<ChromaStore>) -> Result<Ingestor> {
    Ok(Ingestor::new(Arc::new(self.embedder()?), store, self.ingest_options()))
  }

  pub fn voice_processor(&self) -> Result<VoiceProcessor> {
    Ok(VoiceProcessor::new(Arc::new(self.transcriber()?), self.voice_options()))
  }
}
