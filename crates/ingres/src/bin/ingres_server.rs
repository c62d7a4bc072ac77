//! Groundwater assistant REST server
//!
//! Serves /ask, /ingres, /voice/complete and the forecast endpoints.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use ingres::config::{load_env, Settings};
use ingres::predictions::PredictionTable;
use ingres::server::{start_server, AppState};

#[derive(Parser)]
#[command(name = "ingres_server")]
#[command(about = "Groundwater Assistant REST API Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
  /// Server bind address
  #[arg(long, env = "INGRES_BIND", default_value = "127.0.0.1:8000")]
  bind: SocketAddr,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,

  #[command(flatten)]
  settings: Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
  let env_file = load_env();
  let args = Args::parse();
  ingres::logging::init(args.verbose);

  tracing::info!("Starting Groundwater Assistant v{}", env!("CARGO_PKG_VERSION"));
  if let Some(path) = env_file {
    tracing::info!("Loaded environment from {}", path.display());
  }

  let settings = &args.settings;
  let store = Arc::new(settings.vector_store()?);
  tracing::info!("Vector store: {} ({:?} layout)", settings.chroma_url, settings.collection_layout);

  let state = AppState::new(
    settings.pipeline(store.clone())?,
    settings.ingestor(store)?,
    settings.voice_processor()?,
    PredictionTable::load(&settings.predictions),
    settings.data_file.clone(),
    settings.temp_dir.clone(),
  );

  start_server(args.bind, state).await
}
