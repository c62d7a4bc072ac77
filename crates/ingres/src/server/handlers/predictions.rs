//! Forecast lookup endpoints

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};

use crate::server::state::AppState;
use crate::server::types::{ErrorResponse, PredictionParams};

const NO_PREDICTIONS: &str = "Prediction data not found on server.";
const NO_LOCATION: &str = "No data found for the selected location.";

/// GET /get_locations - States with their forecast districts
pub async fn get_locations(State(state): State<AppState>) -> Response {
  if state.predictions.is_empty() {
    return ErrorResponse::new(NO_PREDICTIONS).into_response();
  }
  Json(state.predictions.locations()).into_response()
}

/// GET /get_predictions - Yearly forecasts for one district
pub async fn get_predictions(
  State(state): State<AppState>,
  Query(params): Query<PredictionParams>,
) -> Response {
  if state.predictions.is_empty() {
    return ErrorResponse::new(NO_PREDICTIONS).into_response();
  }
  let rows = state.predictions.for_location(&params.state, &params.district);
  if rows.is_empty() {
    return ErrorResponse::new(NO_LOCATION).into_response();
  }
  Json(rows).into_response()
}
