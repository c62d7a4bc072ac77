mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ingres::persona::Language;
use ingres::predictions::{PredictionRow, PredictionTable};
use ingres::prompt::STRUCTURED_ERROR_HTML;
use ingres::server::create_router;

use common::{sample_csv, sine_wav, test_app, write_file, TestApp, HEADER};

const BOUNDARY: &str = "ingres-test-boundary";

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
  let response = create_router(app.state.clone()).oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = response.into_body().collect().await.unwrap().to_bytes();
  (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// (name, file name, bytes) parts encoded as multipart/form-data
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
  multipart_to("/voice/complete", parts)
}

fn multipart_to(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
  let mut body = Vec::new();
  for (name, file_name, bytes) in parts {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match file_name {
      Some(file_name) => body.extend_from_slice(
        format!(
          "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
           Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
      ),
      None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes()),
    }
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
    .body(Body::from(body))
    .unwrap()
}

fn predictions() -> PredictionTable {
  let row = |district: &str, year: i64, parameter: &str, value: f64| PredictionRow {
    state: "Goa".to_string(),
    district: district.to_string(),
    year,
    parameter: parameter.to_string(),
    predicted_value: value,
  };
  PredictionTable::new(vec![
    row("North Goa", 2024, "Rainfall(Total)", 3100.0),
    row("North Goa", 2025, "Rainfall(Total)", 3150.0),
    row("North Goa", 2025, "Rainfall Recharge", 420.0),
    row("South Goa", 2024, "Rainfall(Total)", 2900.0),
  ])
}

#[tokio::test]
async fn test_status_and_version() {
  let app = test_app("ok", "", predictions());

  let (status, body) = send(&app, get("/status")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["predictions_loaded"], 4);

  let (status, body) = send(&app, get("/version")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ask_returns_model_html() {
  let app = test_app("<p>Plenty of rain.</p>", "", PredictionTable::default());
  let data = write_file(app.temp.path(), "data.csv", &sample_csv());
  app.state.ingestor.ingest(&data).await.unwrap();

  let (status, body) = send(&app, get("/ask?query=Rainfall%20in%20Goa&persona=Research%20Analyst")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["answer"], "<p>Plenty of rain.</p>");
  assert!(app.generator.last_prompt().unwrap().contains("Query: Rainfall in Goa"));
}

#[tokio::test]
async fn test_ask_without_parameters_is_still_ok() {
  let app = test_app("<p>Hello</p>", "", PredictionTable::default());

  // nothing ingested: the shared collection is missing, so the English apology comes back
  let (status, body) = send(&app, get("/ask")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["answer"], Language::English.apology());
}

#[tokio::test]
async fn test_ask_structured_with_unparseable_reply() {
  let app = test_app("not json at all", "", PredictionTable::default());
  let data = write_file(app.temp.path(), "data.csv", &sample_csv());
  app.state.ingestor.ingest(&data).await.unwrap();

  let (status, body) = send(&app, get("/ask?query=Goa&format=structured")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["answer"]["html_answer"], STRUCTURED_ERROR_HTML);
  assert!(body["answer"]["chart_data"].is_null());
}

#[tokio::test]
async fn test_ingest_endpoint_with_upload() {
  let app = test_app("ok", "", PredictionTable::default());
  let csv = sample_csv();

  let (status, body) = send(&app, multipart_to("/ingres", &[("file", Some("upload.csv"), csv.as_bytes())])).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "INGRES pipeline completed");
  assert_eq!(body["inserted"], 3);

  let staged: Vec<_> = std::fs::read_dir(app.upload_dir()).map(|d| d.collect()).unwrap_or_default();
  assert!(staged.is_empty());
}

#[tokio::test]
async fn test_ingest_endpoint_reports_missing_columns() {
  let app = test_app("ok", "", PredictionTable::default());
  write_file(app.temp.path(), "data.csv", "State,District\nGoa,North Goa\n");

  let request = Request::builder().method("POST").uri("/ingres").body(Body::empty()).unwrap();
  let (status, body) = send(&app, request).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "error");
  assert!(body["error"].as_str().unwrap().contains("missing required columns"));
  assert!(app.store.collection_names().await.is_empty());
}

#[tokio::test]
async fn test_ingest_endpoint_uses_default_file() {
  let app = test_app("ok", "", PredictionTable::default());
  write_file(app.temp.path(), "data.csv", &format!("{HEADER}\nGoa,North Goa,2020,3200,410,520,120,380,900,10\n"));

  let request = Request::builder().method("POST").uri("/ingres").body(Body::empty()).unwrap();
  let (status, body) = send(&app, request).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["rows"], 1);
}

#[tokio::test]
async fn test_voice_without_audio() {
  let app = test_app("ok", "rainfall in goa", PredictionTable::default());

  let (status, body) = send(&app, multipart(&[("persona", None, b"Field Technician".as_slice())])).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["error"], "No audio file provided");
  assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_voice_with_undecodable_audio_cleans_up() {
  let app = test_app("ok", "rainfall in goa", PredictionTable::default());

  let (status, body) = send(&app, multipart(&[("audio_file", Some("clip.webm"), b"definitely not audio".as_slice())])).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["error"], "Could not transcribe audio");

  let leftovers: Vec<_> = std::fs::read_dir(app.voice_dir()).unwrap().collect();
  assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_voice_complete_answers_transcript() {
  let reply = r#"{"html_answer": "<p>Goa is fine.</p>", "chart_data": null}"#;
  let app = test_app(reply, "  How is rainfall in Goa?  ", PredictionTable::default());
  let data = write_file(app.temp.path(), "data.csv", &sample_csv());
  app.state.ingestor.ingest(&data).await.unwrap();

  let wav = sine_wav(8_000, 0.25);
  let (status, body) = send(
    &app,
    multipart(&[("audio_file", Some("clip.wav"), wav.as_slice()), ("language", None, b"English".as_slice())]),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "success");
  assert_eq!(body["transcribed_text"], "How is rainfall in Goa?");
  assert_eq!(body["answer"]["html_answer"], "<p>Goa is fine.</p>");

  let leftovers: Vec<_> = std::fs::read_dir(app.voice_dir()).unwrap().collect();
  assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_locations_and_predictions() {
  let app = test_app("ok", "", predictions());

  let (status, body) = send(&app, get("/get_locations")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["Goa"], serde_json::json!(["North Goa", "South Goa"]));

  let (status, body) = send(&app, get("/get_predictions?state=Goa&district=North%20Goa")).await;
  assert_eq!(status, StatusCode::OK);
  let rows = body.as_array().unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0]["Year"], 2024);
  assert_eq!(rows[0]["Rainfall(Total)"], 3100.0);
  assert!(rows[0]["Rainfall Recharge"].is_null());
  assert_eq!(rows[1]["Rainfall Recharge"], 420.0);

  let (_, body) = send(&app, get("/get_predictions?state=Goa&district=Nowhere")).await;
  assert_eq!(body["error"], "No data found for the selected location.");
}

#[tokio::test]
async fn test_prediction_endpoints_without_data() {
  let app = test_app("ok", "", PredictionTable::default());

  let (status, body) = send(&app, get("/get_locations")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["error"], "Prediction data not found on server.");

  let (_, body) = send(&app, get("/get_predictions?state=Goa&district=North%20Goa")).await;
  assert_eq!(body["error"], "Prediction data not found on server.");
}
