use assert_cmd::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;

#[test]
fn test_cli_help_lists_commands() {
  Command::cargo_bin("ingres")
    .unwrap()
    .arg("--help")
    .assert()
    .success()
    .stdout(contains("ingest").and(contains("ask")).and(contains("forecast")).and(contains("inspect")));
}

#[test]
fn test_server_help_shows_bind() {
  Command::cargo_bin("ingres_server")
    .unwrap()
    .arg("--help")
    .assert()
    .success()
    .stdout(contains("--bind").and(contains("--chroma-url")));
}

#[test]
fn test_forecast_command_writes_predictions() {
  let temp = tempfile::tempdir().unwrap();
  let input = temp.path().join("history.csv");
  let output = temp.path().join("predictions.csv");
  std::fs::write(
    &input,
    "State,District,Year,Rainfall(Total)\nGoa,North Goa,2019,3100\nGoa,North Goa,2020,3200\n",
  )
  .unwrap();

  Command::cargo_bin("ingres")
    .unwrap()
    .current_dir(temp.path())
    .env("NO_COLOR", "1")
    .args(["forecast", "--periods", "2", "--workers", "1", "--input"])
    .arg(&input)
    .arg("--output")
    .arg(&output)
    .assert()
    .success()
    .stdout(contains("Saved 2 predictions"));

  let written = std::fs::read_to_string(&output).unwrap();
  assert!(written.starts_with("State,District,Year,Parameter,Predicted_Value"));
  assert!(written.contains("Goa,North Goa,2022,Rainfall(Total),"));
}

#[test]
fn test_ask_requires_query() {
  Command::cargo_bin("ingres").unwrap().arg("ask").assert().failure();
}
