//! Ingestion endpoint

use axum::extract::{Extension, FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{ErrorResponse, IngestResponse};

const COMPLETED: &str = "INGRES pipeline completed";

/// POST /ingres - Ingest an uploaded spreadsheet (multipart field `file`),
/// or the configured default file when nothing is uploaded
pub async fn run_ingest(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  request: Request,
) -> Response {
  let upload = match stage_upload(&state, request).await {
    Ok(upload) => upload,
    Err(message) => {
      context.log_error(&message);
      return ErrorResponse::with_status(message).into_response();
    }
  };

  let result = match &upload {
    Some(file) => {
      context.log_info(&format!("Running ingestion with uploaded file {}", file.path().display()));
      state.ingestor.ingest(file.path()).await
    }
    None => {
      context.log_info(&format!("Running ingestion with default file {}", state.data_file.display()));
      state.ingestor.ingest(&state.data_file).await
    }
  };

  match result {
    Ok(report) => {
      context.log_info(&format!("Ingested {}/{} rows", report.inserted, report.rows));
      Json(IngestResponse { status: COMPLETED.to_string(), rows: report.rows, inserted: report.inserted })
        .into_response()
    }
    Err(e) => {
      context.log_error(&format!("Ingestion failed after {} rows: {e}", e.inserted()));
      ErrorResponse::with_status(e.to_string()).into_response()
    }
  }
}

/// Save the `file` field of a multipart body to a temporary file that keeps
/// the upload's extension
async fn stage_upload(state: &AppState, request: Request) -> Result<Option<NamedTempFile>, String> {
  let is_multipart = request
    .headers()
    .get(CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v.starts_with("multipart/form-data"));
  if !is_multipart {
    return Ok(None);
  }

  let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| e.body_text())?;
  while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
    if field.name() != Some("file") {
      continue;
    }
    let suffix = field
      .file_name()
      .and_then(|name| Path::new(name).extension())
      .and_then(|ext| ext.to_str())
      .map(|ext| format!(".{ext}"))
      .unwrap_or_else(|| ".xlsx".to_string());
    let bytes = field.bytes().await.map_err(|e| e.body_text())?;
    if bytes.is_empty() {
      return Ok(None);
    }

    tokio::fs::create_dir_all(&state.upload_dir)
      .await
      .map_err(|e| format!("failed to create upload directory: {e}"))?;
    let file = tempfile::Builder::new()
      .prefix("upload_")
      .suffix(&suffix)
      .tempfile_in(&state.upload_dir)
      .map_err(|e| format!("failed to stage upload: {e}"))?;
    tokio::fs::write(file.path(), &bytes).await.map_err(|e| format!("failed to stage upload: {e}"))?;
    return Ok(Some(file));
  }
  Ok(None)
}
