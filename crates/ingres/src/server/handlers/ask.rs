//! Question answering endpoint

use axum::extract::{Extension, Query, State};
use axum::response::Json;

use crate::persona::{Language, Persona};
use crate::pipeline;
use crate::prompt::AnswerFormat;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{AskParams, AskResponse};

/// GET /ask - Answer a groundwater question; always 200
pub async fn ask(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Query(params): Query<AskParams>,
) -> Json<AskResponse> {
  context.log_info(&format!(
    "query={:?} persona={:?} language={:?} format={:?}",
    params.query, params.persona, params.language, params.format
  ));

  let query = pipeline::Query::new(params.query, Persona::parse(&params.persona), Language::parse(&params.language));
  let answer = state.pipeline.answer(&query, AnswerFormat::parse(&params.format)).await;

  context.log_info("Returning response to client");
  Json(AskResponse { answer })
}
