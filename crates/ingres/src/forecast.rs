//! Offline forecasting job
//!
//! Fits an independent linear trend per (state, district, parameter) series
//! and projects it a fixed number of years forward. Locations are spread over
//! a pool of scoped worker threads; the merged result is written once as CSV.

use anyhow::{Context, Result};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::predictions::PredictionRow;
use crate::records::{
  DISTRICT, FRESH_GROUND_WATER, GROUNDWATER_RECHARGE_HAM, GROUND_WATER_IRRIGATION, RAINFALL_RECHARGE,
  RAINFALL_TOTAL, SALINE_GROUND_WATER, STATE, SURFACE_WATER_IRRIGATION, YEAR,
};
use crate::spreadsheet::{Cell, Sheet};

/// Series forecast for every location
pub const FORECAST_PARAMETERS: [&str; 7] = [
  RAINFALL_TOTAL,
  RAINFALL_RECHARGE,
  GROUNDWATER_RECHARGE_HAM,
  SURFACE_WATER_IRRIGATION,
  GROUND_WATER_IRRIGATION,
  FRESH_GROUND_WATER,
  SALINE_GROUND_WATER,
];

pub const DEFAULT_PERIODS: usize = 10;

/// Least-squares line through (year, value) points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendModel {
  pub slope: f64,
  pub intercept: f64,
}

impl TrendModel {
  /// `None` with fewer than two points or a single distinct year
  pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
    if points.len() < 2 {
      return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx.abs() < f64::EPSILON {
      return None;
    }
    let sxy: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

    let slope = sxy / sxx;
    let model = Self { slope, intercept: mean_y - slope * mean_x };
    (model.slope.is_finite() && model.intercept.is_finite()).then_some(model)
  }

  pub fn predict(&self, year: f64) -> f64 {
    self.intercept + self.slope * year
  }
}

#[derive(Debug, Clone)]
pub struct ForecastOptions {
  pub periods: usize,
  pub workers: usize,
}

impl Default for ForecastOptions {
  fn default() -> Self {
    Self {
      periods: DEFAULT_PERIODS,
      workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    }
  }
}

/// Observations of one district
#[derive(Debug, Clone)]
struct Location {
  state: String,
  district: String,
  rows: Vec<usize>,
}

/// Leading four-digit year of a cell (`2020`, `2020.0`, `"2020-21"`)
fn year_of(cell: &Cell) -> Option<i64> {
  match cell {
    Cell::Number(value) => Some(value.round() as i64),
    Cell::Text(text) => {
      let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
      (digits.len() == 4).then(|| digits.parse().ok()).flatten()
    }
    Cell::Empty => None,
  }
}

/// Group de-duplicated rows by (state, district), first occurrence wins
fn locations(sheet: &Sheet) -> Vec<Location> {
  let mut seen = HashSet::new();
  let mut groups: Vec<Location> = Vec::new();

  for row in 0..sheet.len() {
    let state = sheet.value(row, STATE).as_text();
    let district = sheet.value(row, DISTRICT).as_text();
    let year = sheet.value(row, YEAR).as_text();
    if !seen.insert((state.clone(), district.clone(), year)) {
      continue;
    }
    match groups.iter_mut().find(|g| g.state == state && g.district == district) {
      Some(group) => group.rows.push(row),
      None => groups.push(Location { state, district, rows: vec![row] }),
    }
  }
  groups
}

fn forecast_location(sheet: &Sheet, location: &Location, periods: usize) -> Vec<PredictionRow> {
  let mut predictions = Vec::new();

  for parameter in FORECAST_PARAMETERS {
    let Some(column) = sheet.column_index(parameter) else {
      continue;
    };
    let points: Vec<(f64, f64)> = location
      .rows
      .iter()
      .filter_map(|&row| {
        let year = year_of(sheet.value(row, YEAR))?;
        let value = sheet.cell(row, column).as_f64()?;
        Some((year as f64, value))
      })
      .collect();

    let Some(model) = TrendModel::fit(&points) else {
      continue;
    };
    let last_year = points.iter().map(|(year, _)| *year as i64).max().unwrap_or_default();

    predictions.extend((1..=periods as i64).map(|offset| {
      let year = last_year + offset;
      PredictionRow {
        state: location.state.clone(),
        district: location.district.clone(),
        year,
        parameter: parameter.to_string(),
        predicted_value: model.predict(year as f64),
      }
    }));
  }

  predictions
}

/// Forecast every location of `sheet`, sorted by (state, district, parameter, year)
pub fn forecast_sheet(sheet: &Sheet, options: &ForecastOptions) -> Vec<PredictionRow> {
  let groups = locations(sheet);
  let total = groups.len();
  let workers = options.workers.clamp(1, total.max(1));
  info!("Found {total} unique locations to process with {workers} worker(s)");

  let queue = Mutex::new(groups.into_iter().collect::<VecDeque<_>>());
  let results = Mutex::new(Vec::new());
  let done = AtomicUsize::new(0);

  std::thread::scope(|scope| {
    for _ in 0..workers {
      scope.spawn(|| loop {
        let next = match queue.lock() {
          Ok(mut queue) => queue.pop_front(),
          Err(_) => None,
        };
        let Some(location) = next else {
          break;
        };

        let predictions = forecast_location(sheet, &location, options.periods);
        if let Ok(mut results) = results.lock() {
          results.extend(predictions);
        }

        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % 50 == 0 || finished == total {
          info!("Forecasting: {finished}/{total} locations");
        }
      });
    }
  });

  let mut predictions = results.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
  predictions.sort_by(|a, b| {
    (&a.state, &a.district, &a.parameter, a.year).cmp(&(&b.state, &b.district, &b.parameter, b.year))
  });
  predictions
}

/// Write predictions as CSV, replacing any existing file
pub fn write_predictions(path: &Path, predictions: &[PredictionRow]) -> Result<()> {
  let mut writer =
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
  for prediction in predictions {
    writer.serialize(prediction)?;
  }
  writer.flush()?;
  Ok(())
}

/// Read `input`, forecast, and write `output`; returns the number of predictions.
/// Nothing is written when no series could be forecast.
pub fn run_forecast(input: &Path, output: &Path, header_row: usize, options: &ForecastOptions) -> Result<usize> {
  let sheet = Sheet::from_path(input, header_row)?;
  info!("Loaded {} rows from {}", sheet.len(), input.display());

  let predictions = forecast_sheet(&sheet, options);
  if predictions.is_empty() {
    warn!("No predictions were generated. Please check your data.");
    return Ok(0);
  }

  write_predictions(output, &predictions)?;
  info!("Saved {} predictions to {}", predictions.len(), output.display());
  Ok(predictions.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_trend_fit() {
    let model = TrendModel::fit(&[(2018.0, 10.0), (2019.0, 12.0), (2020.0, 14.0)]).unwrap();
    assert!((model.slope - 2.0).abs() < 1e-9);
    assert!((model.predict(2021.0) - 16.0).abs() < 1e-9);
  }

  #[test]
  fn test_trend_fit_rejects_degenerate_series() {
    assert!(TrendModel::fit(&[(2020.0, 1.0)]).is_none());
    assert!(TrendModel::fit(&[(2020.0, 1.0), (2020.0, 2.0)]).is_none());
  }

  #[test]
  fn test_year_parsing() {
    assert_eq!(year_of(&Cell::Number(2020.0)), Some(2020));
    assert_eq!(year_of(&Cell::Text("2020-21".to_string())), Some(2020));
    assert_eq!(year_of(&Cell::Text("n/a".to_string())), None);
  }
}
