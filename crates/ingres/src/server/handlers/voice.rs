//! Voice question endpoint

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart, State};
use axum::response::{IntoResponse, Json, Response};

use crate::persona::{Language, Persona, DEFAULT_LANGUAGE, DEFAULT_PERSONA};
use crate::pipeline::Query;
use crate::prompt::AnswerFormat;
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{ErrorResponse, VoiceResponse};

struct VoiceUpload {
  audio: Vec<u8>,
  file_name: Option<String>,
  persona: String,
  language: String,
}

async fn read_upload(mut multipart: Multipart) -> Result<VoiceUpload, String> {
  let mut audio = None;
  let mut file_name = None;
  let mut persona = DEFAULT_PERSONA.to_string();
  let mut language = DEFAULT_LANGUAGE.to_string();

  while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
    match field.name() {
      Some("audio_file") => {
        file_name = field.file_name().map(str::to_string);
        audio = Some(field.bytes().await.map_err(|e| e.body_text())?.to_vec());
      }
      Some("persona") => persona = field.text().await.map_err(|e| e.body_text())?,
      Some("language") => language = field.text().await.map_err(|e| e.body_text())?,
      _ => {}
    }
  }

  let audio = audio.filter(|bytes| !bytes.is_empty()).ok_or("No audio file provided")?;
  Ok(VoiceUpload { audio, file_name, persona, language })
}

/// POST /voice/complete - Transcribe an audio question and answer it in structured form
pub async fn voice_complete(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Response {
  let upload = match multipart.map_err(|e| e.body_text()) {
    Ok(multipart) => read_upload(multipart).await,
    Err(message) => Err(message),
  };
  let upload = match upload {
    Ok(upload) => upload,
    Err(message) => {
      context.log_warn(&message);
      return ErrorResponse::with_status(message).into_response();
    }
  };
  context.log_info(&format!("Received {} bytes of audio", upload.audio.len()));

  let transcribed_text = state.voice.process(&upload.audio, upload.file_name.as_deref()).await;
  if transcribed_text.is_empty() {
    context.log_error("Could not transcribe audio");
    return ErrorResponse::with_status("Could not transcribe audio").into_response();
  }
  context.log_info(&format!("Transcribed: {transcribed_text}"));

  let query = Query::new(
    transcribed_text.clone(),
    Persona::parse(&upload.persona),
    Language::parse(&upload.language),
  );
  let answer = state.pipeline.answer(&query, AnswerFormat::Structured).await;

  Json(VoiceResponse { transcribed_text, answer, status: "success".to_string() }).into_response()
}
