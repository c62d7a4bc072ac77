//! Voice input: audio clean-up and speech-to-text
//!
//! Uploaded audio is decoded to mono samples, loudness-normalised to
//! −20 dBFS, resampled to 16 kHz, written as 16-bit PCM WAV and handed to a
//! [`Transcriber`]. Temporary files never outlive a call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use rubato::{FftFixedIn, Resampler};
use serde::Deserialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

pub const TARGET_DBFS: f32 = -20.0;
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Speech-to-text over a prepared WAV file
#[async_trait]
pub trait Transcriber: Send + Sync {
  async fn transcribe(&self, wav_path: &Path) -> Result<String>;
}

/// OpenAI-compatible `/audio/transcriptions` client (Whisper)
pub struct WhisperTranscriber {
  client: Client,
  endpoint: String,
  model: String,
  api_key: Option<String>,
}

impl WhisperTranscriber {
  pub fn new(base_url: &str, model: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
    let client =
      Client::builder().timeout(timeout).build().context("failed to build transcription HTTP client")?;
    Ok(Self {
      client,
      endpoint: format!("{}/audio/transcriptions", base_url.trim_end_matches('/')),
      model: model.to_string(),
      api_key: api_key.map(str::to_string).filter(|k| !k.trim().is_empty()),
    })
  }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
  text: String,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
  async fn transcribe(&self, wav_path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(wav_path).await.context("failed to read prepared WAV file")?;
    let file = Part::bytes(bytes).file_name("audio.wav").mime_str("audio/wav")?;
    let form = Form::new().part("file", file).text("model", self.model.clone());

    let mut request = self.client.post(&self.endpoint).multipart(form);
    if let Some(key) = &self.api_key {
      request = request.bearer_auth(key);
    }

    let response = request.send().await.context("transcription request failed")?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      anyhow::bail!("transcription failed ({status}): {body}");
    }

    let parsed: TranscriptionResponse =
      response.json().await.context("failed to parse transcription response")?;
    Ok(parsed.text)
  }
}

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct Audio {
  /// Interleaved samples in [-1.0, 1.0]
  pub samples: Vec<f32>,
  pub channels: u16,
  pub sample_rate: u32,
}

/// Loudness of `samples` in dB relative to full scale; `-inf` for silence
pub fn dbfs(samples: &[f32]) -> f32 {
  if samples.is_empty() {
    return f32::NEG_INFINITY;
  }
  let mean_square = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum::<f64>() / samples.len() as f64;
  if mean_square == 0.0 {
    return f32::NEG_INFINITY;
  }
  (10.0 * mean_square.log10()) as f32
}

/// Apply the gain that brings `samples` to `target_dbfs`, clamping to full scale.
/// Silent input is left untouched.
pub fn normalize(samples: &mut [f32], target_dbfs: f32) {
  let current = dbfs(samples);
  if !current.is_finite() {
    return;
  }
  let factor = 10f32.powf((target_dbfs - current) / 20.0);
  for sample in samples.iter_mut() {
    *sample = (*sample * factor).clamp(-1.0, 1.0);
  }
}

/// Average interleaved channels into one
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
  if channels <= 1 {
    return samples.to_vec();
  }
  samples.chunks(channels as usize).map(|frame| frame.iter().sum::<f32>() / frame.len() as f32).collect()
}

const RESAMPLE_CHUNK: usize = 1024;

/// Band-limited resampler; the FFT filter removes content above the target
/// Nyquist frequency before decimating. Output length is `len * to / from`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
  if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
    return Ok(samples.to_vec());
  }
  let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 2, 1)
    .context("failed to build resampler")?;
  let delay = resampler.output_delay();
  let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round().max(1.0) as usize;
  let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

  let mut position = 0;
  while position + resampler.input_frames_next() <= samples.len() {
    let end = position + resampler.input_frames_next();
    let chunk = [&samples[position..end]];
    output.extend_from_slice(&resampler.process(&chunk[..], None)?[0]);
    position = end;
  }
  if position < samples.len() {
    let tail = [&samples[position..]];
    output.extend_from_slice(&resampler.process_partial(Some(&tail[..]), None)?[0]);
  }
  // flush the filter delay
  while output.len() < expected + delay {
    let flushed = resampler.process_partial::<&[f32]>(None, None)?;
    if flushed[0].is_empty() {
      break;
    }
    output.extend_from_slice(&flushed[0]);
  }

  output.drain(..delay.min(output.len()));
  output.truncate(expected);
  Ok(output)
}

/// Decode a RIFF/WAV blob in-process
pub fn decode_wav(bytes: &[u8]) -> Result<Audio> {
  let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("invalid WAV data")?;
  let spec = reader.spec();

  let samples: Vec<f32> = match spec.sample_format {
    hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    hound::SampleFormat::Int => {
      let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
      reader.samples::<i32>().map(|s| s.map(|v| v as f32 / scale)).collect::<Result<_, _>>()?
    }
  };

  Ok(Audio { samples, channels: spec.channels, sample_rate: spec.sample_rate })
}

/// Write mono 16-bit PCM WAV
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
  let spec = hound::WavSpec {
    channels: 1,
    sample_rate,
    bits_per_sample: 16,
    sample_format: hound::SampleFormat::Int,
  };
  let mut writer = hound::WavWriter::create(path, spec).context("failed to create WAV file")?;
  for sample in samples {
    writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
  }
  writer.finalize()?;
  Ok(())
}

/// Downmix, normalise and resample for speech recognition
pub fn prepare(audio: Audio) -> Result<Vec<f32>> {
  let mut mono = downmix(&audio.samples, audio.channels);
  normalize(&mut mono, TARGET_DBFS);
  resample(&mono, audio.sample_rate, TARGET_SAMPLE_RATE)
}

#[derive(Debug, Clone)]
pub struct VoiceOptions {
  pub temp_dir: PathBuf,
  pub ffmpeg: String,
}

pub struct VoiceProcessor {
  transcriber: Arc<dyn Transcriber>,
  options: VoiceOptions,
}

impl VoiceProcessor {
  pub fn new(transcriber: Arc<dyn Transcriber>, options: VoiceOptions) -> Self {
    Self { transcriber, options }
  }

  /// Transcribe an uploaded blob; any failure yields an empty string
  pub async fn process(&self, bytes: &[u8], file_name: Option<&str>) -> String {
    match self.try_process(bytes, file_name).await {
      Ok(text) => text.trim().to_string(),
      Err(e) => {
        error!("Voice processing error: {e:#}");
        String::new()
      }
    }
  }

  async fn try_process(&self, bytes: &[u8], file_name: Option<&str>) -> Result<String> {
    tokio::fs::create_dir_all(&self.options.temp_dir)
      .await
      .with_context(|| format!("failed to create {}", self.options.temp_dir.display()))?;

    let suffix = file_name
      .and_then(|name| Path::new(name).extension())
      .and_then(|ext| ext.to_str())
      .map(|ext| format!(".{ext}"))
      .unwrap_or_else(|| ".webm".to_string());
    let upload = self.temp_file("upload_", &suffix)?;
    tokio::fs::write(upload.path(), bytes).await.context("failed to write uploaded audio")?;

    let audio = if bytes.starts_with(b"RIFF") {
      decode_wav(bytes)?
    } else {
      self.decode_with_ffmpeg(upload.path()).await?
    };
    anyhow::ensure!(!audio.samples.is_empty(), "no audio samples decoded");
    debug!("Decoded {} samples at {} Hz, {} channel(s)", audio.samples.len(), audio.sample_rate, audio.channels);

    let prepared = prepare(audio)?;
    let wav = self.temp_file("prepared_", ".wav")?;
    write_wav(wav.path(), &prepared, TARGET_SAMPLE_RATE)?;

    let text = self.transcriber.transcribe(wav.path()).await?;
    info!("Transcribed {} chars of speech", text.trim().len());
    Ok(text)
  }

  fn temp_file(&self, prefix: &str, suffix: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
      .prefix(prefix)
      .suffix(suffix)
      .tempfile_in(&self.options.temp_dir)
      .context("failed to create temporary audio file")
  }

  /// Decode any container ffmpeg understands straight to mono 16 kHz f32
  async fn decode_with_ffmpeg(&self, input: &Path) -> Result<Audio> {
    let output = tokio::process::Command::new(&self.options.ffmpeg)
      .arg("-hide_banner")
      .args(["-loglevel", "error", "-i"])
      .arg(input)
      .args(["-f", "f32le", "-ac", "1", "-ar"])
      .arg(TARGET_SAMPLE_RATE.to_string())
      .arg("-")
      .kill_on_drop(true)
      .output()
      .await
      .with_context(|| format!("failed to run {}", self.options.ffmpeg))?;

    if !output.status.success() {
      anyhow::bail!("ffmpeg could not decode audio: {}", String::from_utf8_lossy(&output.stderr).trim());
    }

    let samples =
      output.stdout.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect();
    Ok(Audio { samples, channels: 1, sample_rate: TARGET_SAMPLE_RATE })
  }
}
