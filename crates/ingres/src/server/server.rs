//! REST server startup and configuration

use anyhow::Result;
use axum::serve;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::server::routing::create_router;
use crate::server::state::AppState;

/// Start the REST server
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
  tracing::info!("Starting groundwater assistant on http://{addr}");

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await?;
  tracing::info!("Server listening on {addr}");

  match serve(listener, app).await {
    Ok(_) => {
      tracing::info!("Server shutdown gracefully");
      Ok(())
    }
    Err(e) => {
      tracing::error!("Server error: {e}");
      Err(anyhow::anyhow!("Server error: {}", e))
    }
  }
}
