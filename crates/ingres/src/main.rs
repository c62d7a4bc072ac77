use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ingres::cli::commands;
use ingres::config::{load_env, Settings};
use ingres::persona::{DEFAULT_LANGUAGE, DEFAULT_PERSONA};

#[derive(Parser)]
#[command(name = "ingres")]
#[command(
  about = "INGRES - Groundwater Assistant\nIngest groundwater/rainfall spreadsheets, ask questions about them, and forecast trends"
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
  #[command(flatten)]
  settings: Settings,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load a spreadsheet into the vector store, replacing earlier contents
  Ingest {
    /// Spreadsheet to ingest (defaults to INGRES_DATA_FILE)
    #[arg(short, long)]
    file: Option<PathBuf>,
  },
  /// Ask a question about the ingested data
  Ask {
    /// The question
    #[arg(required = true)]
    query: Vec<String>,
    /// Persona that shapes the answer style
    #[arg(short, long, default_value = DEFAULT_PERSONA)]
    persona: String,
    /// Answer language
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    language: String,
    /// Request the JSON answer with chart data
    #[arg(short, long)]
    structured: bool,
  },
  /// Forecast every district's parameters and write the predictions CSV
  Forecast {
    /// Historical spreadsheet (defaults to INGRES_DATA_FILE)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Output CSV (defaults to INGRES_PREDICTIONS)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Worker threads (defaults to the number of CPU cores)
    #[arg(short, long)]
    workers: Option<usize>,
    /// Years to forecast past the last observation
    #[arg(long)]
    periods: Option<usize>,
  },
  /// Transcribe an audio file
  Transcribe {
    /// Audio file (wav, webm, ogg, mp3, ...)
    file: PathBuf,
  },
  /// Show stored documents per collection
  Inspect {
    /// Documents to show per collection
    #[arg(short, long, default_value_t = 5)]
    limit: usize,
  },
  /// Smoke-test a running server
  Check {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    url: String,
    /// Question sent to /ask
    #[arg(short, long, default_value = "What is the groundwater status in Rajasthan?")]
    query: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  load_env();
  let cli = Cli::parse();
  ingres::logging::init(cli.verbose);

  let settings = &cli.settings;
  match cli.command {
    Command::Ingest { file } => commands::ingest(settings, file).await,
    Command::Ask { query, persona, language, structured } => {
      commands::ask(settings, &query.join(" "), &persona, &language, structured).await
    }
    Command::Forecast { input, output, workers, periods } => {
      commands::forecast(settings, input, output, workers, periods).await
    }
    Command::Transcribe { file } => commands::transcribe(settings, file).await,
    Command::Inspect { limit } => commands::inspect(settings, limit).await,
    Command::Check { url, query } => commands::check(&url, &query, settings.http_timeout_secs).await,
  }
}
