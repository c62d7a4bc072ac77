use anyhow::{anyhow, Result};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::client::{ClientConfig, IngresClient};
use crate::cli::display::{display_answer, wrap_text};
use crate::config::Settings;
use crate::forecast::run_forecast;
use crate::persona::{Language, Persona};
use crate::pipeline::Query;
use crate::prompt::AnswerFormat;
use crate::states::{CollectionLayout, ALL_STATES};
use crate::vector_store::VectorStore;

/// Load a spreadsheet into the vector store
pub async fn ingest(settings: &Settings, file: Option<PathBuf>) -> Result<()> {
  let path = file.unwrap_or_else(|| settings.data_file.clone());
  let ingestor = settings.ingestor(Arc::new(settings.vector_store()?))?;

  match ingestor.ingest(&path).await {
    Ok(report) => {
      println!(
        "{} Stored {} of {} rows from {} in {}",
        "✓".green(),
        report.inserted.to_string().cyan(),
        report.rows,
        path.display().to_string().yellow(),
        report.collections.join(", ")
      );
      Ok(())
    }
    Err(e) => {
      if e.inserted() > 0 {
        println!("{} {} rows were stored before the failure", "!".yellow(), e.inserted());
      }
      Err(anyhow!(e))
    }
  }
}

/// Answer one question through the full pipeline
pub async fn ask(settings: &Settings, query: &str, persona: &str, language: &str, structured: bool) -> Result<()> {
  let pipeline = settings.pipeline(Arc::new(settings.vector_store()?))?;
  let format = if structured { AnswerFormat::Structured } else { AnswerFormat::Html };

  let answer = pipeline.answer(&Query::new(query, Persona::parse(persona), Language::parse(language)), format).await;
  display_answer(&answer);
  Ok(())
}

/// Generate the predictions CSV
pub async fn forecast(
  settings: &Settings,
  input: Option<PathBuf>,
  output: Option<PathBuf>,
  workers: Option<usize>,
  periods: Option<usize>,
) -> Result<()> {
  let input = input.unwrap_or_else(|| settings.data_file.clone());
  let output = output.unwrap_or_else(|| settings.predictions.clone());
  let options = settings.forecast_options(workers, periods);
  let header_row = settings.header_row;

  let written = {
    let (input, output) = (input.clone(), output.clone());
    tokio::task::spawn_blocking(move || run_forecast(&input, &output, header_row, &options)).await??
  };

  if written == 0 {
    println!("{} No predictions were generated from {}", "!".yellow(), input.display());
  } else {
    println!("{} Saved {} predictions to {}", "✓".green(), written.to_string().cyan(), output.display());
  }
  Ok(())
}

/// Transcribe an audio file the way /voice/complete does
pub async fn transcribe(settings: &Settings, file: PathBuf) -> Result<()> {
  let bytes = tokio::fs::read(&file).await?;
  let voice = settings.voice_processor()?;
  let file_name = file.file_name().and_then(|name| name.to_str());

  let text = voice.process(&bytes, file_name).await;
  if text.is_empty() {
    return Err(anyhow!("Could not transcribe {}", file.display()));
  }
  println!("{text}");
  Ok(())
}

/// Show document counts and a sample of stored documents
pub async fn inspect(settings: &Settings, limit: usize) -> Result<()> {
  let store = settings.vector_store()?;
  let collections = match settings.layout() {
    CollectionLayout::Shared { name } => vec![name],
    layout @ CollectionLayout::PerState { .. } => {
      ALL_STATES.iter().map(|state| layout.collection_for_state(state)).collect()
    }
  };

  for collection in collections {
    let count = match store.count(&collection).await {
      Ok(count) => count,
      Err(e) => {
        println!("{} {}: {}", "✗".red(), collection.yellow(), e);
        continue;
      }
    };
    println!("{} {} ({} documents)", "●".blue(), collection.yellow().bold(), count.to_string().cyan());
    if count == 0 {
      continue;
    }

    for document in store.peek(&collection, limit).await? {
      println!("  {}", document.id.dimmed());
      for line in wrap_text(&document.document, 96) {
        println!("    {line}");
      }
    }
    println!();
  }
  Ok(())
}

/// Smoke-test a running server
pub async fn check(base_url: &str, query: &str, timeout_secs: u64) -> Result<()> {
  let client = IngresClient::with_config(ClientConfig { base_url: base_url.to_string(), timeout_secs })?;

  let status = client.status().await?;
  println!(
    "{} Server {} is {} (v{}, {} predictions loaded)",
    "✓".green(),
    base_url.cyan(),
    status.status.green(),
    status.version,
    status.predictions_loaded
  );

  println!("{} Asking: {}", "→".blue(), query.yellow());
  let response = client.ask(query, crate::persona::DEFAULT_PERSONA, crate::persona::DEFAULT_LANGUAGE).await?;
  display_answer(&response.answer);
  Ok(())
}
