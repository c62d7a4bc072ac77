#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ingres::embeddings::EmbeddingProvider;
use ingres::generation::GenerationProvider;
use ingres::ingest::{IngestOptions, Ingestor};
use ingres::pipeline::{PipelineOptions, QueryPipeline};
use ingres::predictions::PredictionTable;
use ingres::records::SentenceTemplate;
use ingres::server::AppState;
use ingres::states::CollectionLayout;
use ingres::vector_store::MemoryStore;
use ingres::voice::{Transcriber, VoiceOptions, VoiceProcessor};

pub const HEADER: &str = "State,District,Year,Rainfall(Total),Rainfall Recharge,Groundwater Recharge (ham),\
Surface Water Irrigation,Ground Water Irrigation,Fresh Total Ground Water Avialable,Saline Ground Water Avialable";

/// Bag-of-words embedder: shared words give nearby vectors
pub struct HashingEmbedder;

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
  async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
    Ok(
      inputs
        .iter()
        .map(|text| {
          let mut vector = vec![0.0f32; 64];
          for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = word.to_lowercase().bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % 64] += 1.0;
          }
          vector
        })
        .collect(),
    )
  }
}

/// Returns a fixed reply and records every prompt it saw
pub struct FixedGenerator {
  reply: String,
  pub prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
  pub fn new(reply: &str) -> Self {
    Self { reply: reply.to_string(), prompts: Mutex::new(Vec::new()) }
  }

  pub fn last_prompt(&self) -> Option<String> {
    self.prompts.lock().unwrap().last().cloned()
  }
}

#[async_trait]
impl GenerationProvider for FixedGenerator {
  async fn generate(&self, prompt: &str) -> Result<String> {
    self.prompts.lock().unwrap().push(prompt.to_string());
    Ok(self.reply.clone())
  }
}

pub struct FixedTranscriber(pub String);

#[async_trait]
impl Transcriber for FixedTranscriber {
  async fn transcribe(&self, _wav_path: &Path) -> Result<String> {
    Ok(self.0.clone())
  }
}

pub fn shared_layout() -> CollectionLayout {
  CollectionLayout::Shared { name: "ingres_test".to_string() }
}

pub fn pipeline(store: Arc<MemoryStore>, generator: Arc<FixedGenerator>) -> QueryPipeline {
  QueryPipeline::new(
    Arc::new(HashingEmbedder),
    store,
    generator,
    PipelineOptions { layout: shared_layout(), n_results: 5 },
  )
}

pub fn ingestor(store: Arc<MemoryStore>) -> Ingestor {
  Ingestor::new(
    Arc::new(HashingEmbedder),
    store,
    IngestOptions { layout: shared_layout(), template: SentenceTemplate::Detailed, batch_size: 2, header_row: 0 },
  )
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub generator: Arc<FixedGenerator>,
  pub temp: tempfile::TempDir,
}

impl TestApp {
  pub fn voice_dir(&self) -> PathBuf {
    self.temp.path().join("audio")
  }

  pub fn upload_dir(&self) -> PathBuf {
    self.temp.path().join("uploads")
  }
}

/// Application state over an in-memory store with canned model output
pub fn test_app(reply: &str, transcript: &str, predictions: PredictionTable) -> TestApp {
  let temp = tempfile::tempdir().unwrap();
  let store = Arc::new(MemoryStore::new());
  let generator = Arc::new(FixedGenerator::new(reply));

  let voice = VoiceProcessor::new(
    Arc::new(FixedTranscriber(transcript.to_string())),
    VoiceOptions { temp_dir: temp.path().join("audio"), ffmpeg: "ingres-test-no-ffmpeg".to_string() },
  );
  let state = AppState::new(
    pipeline(store.clone(), generator.clone()),
    ingestor(store.clone()),
    voice,
    predictions,
    temp.path().join("data.csv"),
    temp.path().join("uploads"),
  );

  TestApp { state, store, generator, temp }
}

pub fn sample_csv() -> String {
  format!(
    "{HEADER}\n\
     Goa,North Goa,2020,3200,410,520,120,380,900,10\n\
     Kerala,Wayanad,2021,2800,350,470,,300,820,5\n\
     Rajasthan,Jaipur,2020,550,80,140,60,400,210,30\n"
  )
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, contents).unwrap();
  path
}

/// Minimal 16-bit mono WAV with a quiet sine tone
pub fn sine_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
  let spec = hound::WavSpec { channels: 1, sample_rate, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
  let mut cursor = std::io::Cursor::new(Vec::new());
  {
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    let total = (sample_rate as f32 * seconds) as usize;
    for i in 0..total {
      let t = i as f32 / sample_rate as f32;
      let sample = (t * 440.0 * std::f32::consts::TAU).sin() * 0.1;
      writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
  }
  cursor.into_inner()
}
