//! Groundwater records and their text form
//!
//! A record is one spreadsheet row. Before storage it is flattened into a
//! single sentence (what gets embedded and retrieved) plus a metadata map of
//! every column.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::spreadsheet::{Cell, Sheet};

pub const STATE: &str = "State";
pub const DISTRICT: &str = "District";
pub const YEAR: &str = "Year";
pub const RAINFALL_TOTAL: &str = "Rainfall(Total)";
pub const RAINFALL_RECHARGE: &str = "Rainfall Recharge";
pub const GROUNDWATER_RECHARGE_HAM: &str = "Groundwater Recharge (ham)";
pub const GROUNDWATER_RECHARGE: &str = "Groundwater Recharge";
pub const SURFACE_WATER_IRRIGATION: &str = "Surface Water Irrigation";
pub const GROUND_WATER_IRRIGATION: &str = "Ground Water Irrigation";
// Spelling matches the published dataset headers.
pub const FRESH_GROUND_WATER: &str = "Fresh Total Ground Water Avialable";
pub const SALINE_GROUND_WATER: &str = "Saline Ground Water Avialable";

/// Sentence layout used when flattening a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentenceTemplate {
  /// Every measured field, keyed by state and district
  #[default]
  Detailed,
  /// Location-first summary of rainfall and recharge
  Compact,
}

impl SentenceTemplate {
  /// Columns a sheet must carry for this template
  pub fn required_columns(&self) -> &'static [&'static str] {
    match self {
      SentenceTemplate::Detailed => &[
        STATE,
        DISTRICT,
        YEAR,
        RAINFALL_TOTAL,
        RAINFALL_RECHARGE,
        GROUNDWATER_RECHARGE_HAM,
        SURFACE_WATER_IRRIGATION,
        GROUND_WATER_IRRIGATION,
        FRESH_GROUND_WATER,
        SALINE_GROUND_WATER,
      ],
      SentenceTemplate::Compact => {
        &[STATE, DISTRICT, YEAR, RAINFALL_TOTAL, RAINFALL_RECHARGE, GROUNDWATER_RECHARGE]
      }
    }
  }

  /// Flatten one row of `sheet` into its sentence
  pub fn render(&self, sheet: &Sheet, row: usize) -> String {
    let v = |column: &str| sheet.value(row, column).to_string();
    match self {
      SentenceTemplate::Detailed => format!(
        "State: {}, District: {}, Rainfall(Total): {}, Rainfall Recharge: {}, \
         Groundwater Recharge: {}, Surface Water Irrigation: {}, Ground Water Irrigation: {}, \
         Fresh Total Ground Water Available: {}, Saline Ground Water Available: {}, Year: {}",
        v(STATE),
        v(DISTRICT),
        v(RAINFALL_TOTAL),
        v(RAINFALL_RECHARGE),
        v(GROUNDWATER_RECHARGE_HAM),
        v(SURFACE_WATER_IRRIGATION),
        v(GROUND_WATER_IRRIGATION),
        v(FRESH_GROUND_WATER),
        v(SALINE_GROUND_WATER),
        v(YEAR),
      ),
      SentenceTemplate::Compact => format!(
        "Location: {}, {}, Year: {}, Rainfall Total: {}, Rainfall Recharge: {}, \
         Groundwater Recharge: {}, Category: Water Resources",
        v(DISTRICT),
        v(STATE),
        v(YEAR),
        v(RAINFALL_TOTAL),
        v(RAINFALL_RECHARGE),
        v(GROUNDWATER_RECHARGE),
      ),
    }
  }
}

/// A metadata value stored beside each document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
  Number(f64),
  Text(String),
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// One row ready for embedding and storage
#[derive(Debug, Clone, PartialEq)]
pub struct GroundwaterRecord {
  pub id: String,
  pub state: String,
  pub text: String,
  pub metadata: Metadata,
}

/// Which columns of a sheet hold only numbers
pub fn numeric_columns(sheet: &Sheet) -> Vec<bool> {
  (0..sheet.headers().len()).map(|column| sheet.is_numeric_column(column)).collect()
}

/// Metadata map for one row: numeric columns default to 0, text columns to ""
pub fn row_metadata(sheet: &Sheet, row: usize, numeric: &[bool]) -> Metadata {
  sheet
    .headers()
    .iter()
    .enumerate()
    .map(|(column, name)| {
      let cell = sheet.cell(row, column);
      let value = if numeric.get(column).copied().unwrap_or(false) {
        MetadataValue::Number(cell.as_f64().unwrap_or(0.0))
      } else {
        match cell {
          Cell::Empty => MetadataValue::Text(String::new()),
          other => MetadataValue::Text(other.as_text()),
        }
      };
      (name.clone(), value)
    })
    .collect()
}

/// Stable document id: `{year}_{row}`
pub fn record_id(sheet: &Sheet, row: usize) -> String {
  format!("{}_{}", sheet.value(row, YEAR), row)
}

/// Flatten every row of a sheet into records
pub fn build_records(sheet: &Sheet, template: SentenceTemplate) -> Vec<GroundwaterRecord> {
  let numeric = numeric_columns(sheet);
  (0..sheet.len())
    .map(|row| GroundwaterRecord {
      id: record_id(sheet, row),
      state: sheet.value(row, STATE).as_text(),
      text: template.render(sheet, row),
      metadata: row_metadata(sheet, row, &numeric),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const HEADER: &str = "State,District,year,Rainfall(Total),Rainfall Recharge,Groundwater Recharge (ham),\
Surface Water Irrigation,Ground Water Irrigation,Fresh Total Ground Water Avialable,Saline Ground Water Avialable";

  fn sheet(body: &str) -> Sheet {
    let csv = format!("{HEADER}\n{body}");
    Sheet::from_csv_reader(csv.as_bytes(), 0).unwrap().unwrap()
  }

  #[test]
  fn test_detailed_sentence() {
    let sheet = sheet("Goa,North Goa,2020,3200.5,410,530,12,44,1200,0\n");
    let records = build_records(&sheet, SentenceTemplate::Detailed);

    assert_eq!(records.len(), 1);
    assert_eq!(
      records[0].text,
      "State: Goa, District: North Goa, Rainfall(Total): 3200.5, Rainfall Recharge: 410, \
       Groundwater Recharge: 530, Surface Water Irrigation: 12, Ground Water Irrigation: 44, \
       Fresh Total Ground Water Available: 1200, Saline Ground Water Available: 0, Year: 2020"
    );
    assert_eq!(records[0].id, "2020_0");
    assert_eq!(records[0].state, "Goa");
  }

  #[test]
  fn test_compact_sentence_requires_its_own_columns() {
    let sheet = sheet("Goa,North Goa,2020,3200.5,410,530,12,44,1200,0\n");
    let missing = sheet.missing_columns(SentenceTemplate::Compact.required_columns());
    assert_eq!(missing, vec![GROUNDWATER_RECHARGE.to_string()]);
  }

  #[test]
  fn test_metadata_defaults() {
    let sheet = sheet("Goa,North Goa,2020,,410,530,12,44,1200,0\nKerala, Idukki ,2020,2900,380,500,10,40,1100,0\n");
    let records = build_records(&sheet, SentenceTemplate::Detailed);

    assert_eq!(records[0].metadata[RAINFALL_TOTAL], MetadataValue::Number(0.0));
    assert_eq!(records[1].metadata[DISTRICT], MetadataValue::Text("Idukki".to_string()));
    assert!(records[0].text.contains("Rainfall(Total): N/A"));
  }
}
