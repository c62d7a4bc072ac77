//! Forecast table served to the analytics endpoints

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// One forecast value, as stored in the predictions CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
  #[serde(rename = "State")]
  pub state: String,
  #[serde(rename = "District")]
  pub district: String,
  #[serde(rename = "Year")]
  pub year: i64,
  #[serde(rename = "Parameter")]
  pub parameter: String,
  #[serde(rename = "Predicted_Value")]
  pub predicted_value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
  rows: Vec<PredictionRow>,
}

impl PredictionTable {
  pub fn new(rows: Vec<PredictionRow>) -> Self {
    Self { rows }
  }

  /// Load the predictions CSV; a missing or unreadable file gives an empty table
  pub fn load(path: &Path) -> Self {
    if !path.exists() {
      warn!("{} not found. Run `ingres forecast` to create it.", path.display());
      return Self::default();
    }
    match std::fs::File::open(path).map_err(anyhow::Error::from).and_then(Self::from_reader) {
      Ok(table) => {
        info!("Loaded {} predictions from {}", table.len(), path.display());
        table
      }
      Err(e) => {
        warn!("Could not load predictions from {}: {e:#}", path.display());
        Self::default()
      }
    }
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let rows = csv_reader
      .deserialize()
      .collect::<Result<Vec<PredictionRow>, _>>()
      .context("malformed predictions CSV")?;
    Ok(Self { rows })
  }

  pub fn rows(&self) -> &[PredictionRow] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// State → districts, districts in first-seen order
  pub fn locations(&self) -> BTreeMap<String, Vec<String>> {
    let mut locations: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in &self.rows {
      let districts = locations.entry(row.state.clone()).or_default();
      if !districts.contains(&row.district) {
        districts.push(row.district.clone());
      }
    }
    locations
  }

  /// Rows for one location pivoted to `{"Year": y, "<Parameter>": value, ...}`,
  /// sorted by year. Parameters without a value for a year are `null`.
  pub fn for_location(&self, state: &str, district: &str) -> Vec<Map<String, Value>> {
    let matching: Vec<&PredictionRow> =
      self.rows.iter().filter(|row| row.state == state && row.district == district).collect();

    let parameters: BTreeSet<&str> = matching.iter().map(|row| row.parameter.as_str()).collect();
    let mut by_year: BTreeMap<i64, BTreeMap<&str, f64>> = BTreeMap::new();
    for row in &matching {
      by_year.entry(row.year).or_default().insert(row.parameter.as_str(), row.predicted_value);
    }

    by_year
      .into_iter()
      .map(|(year, values)| {
        let mut record = Map::new();
        record.insert("Year".to_string(), Value::from(year));
        for parameter in &parameters {
          let value = values.get(parameter).map(|v| Value::from(*v)).unwrap_or(Value::Null);
          record.insert(parameter.to_string(), value);
        }
        record
      })
      .collect()
  }
}
