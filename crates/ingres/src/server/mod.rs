//! HTTP facade for the groundwater assistant
//!
//! Thin axum handlers over the query pipeline, the ingestor, the voice
//! processor and the prediction table. Handlers report either success or a
//! generic `{"error": ...}` object.

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod server;
pub mod state;
pub mod types;

pub use routing::create_router;
pub use server::start_server;
pub use state::AppState;
