//! Tabular input loading
//!
//! Reads Excel/ODS workbooks (first worksheet) and CSV files into a [`Sheet`]:
//! a trimmed header row plus rows of typed cells.

use calamine::{open_workbook_auto, Data, Reader};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::SheetError;

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Empty,
  Number(f64),
  Text(String),
}

impl Cell {
  /// Interpret a raw text cell the way a dataframe reader would
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
      return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
      Ok(value) if value.is_finite() => Cell::Number(value),
      _ => Cell::Text(raw.to_string()),
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Cell::Number(value) => Some(*value),
      _ => None,
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Cell::Empty)
  }

  /// Text content with surrounding whitespace removed
  pub fn as_text(&self) -> String {
    match self {
      Cell::Text(text) => text.trim().to_string(),
      other => other.to_string(),
    }
  }
}

impl fmt::Display for Cell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Cell::Empty => write!(f, "N/A"),
      Cell::Number(value) => write!(f, "{}", format_number(*value)),
      Cell::Text(text) => write!(f, "{}", text.trim()),
    }
  }
}

/// Render a number without a trailing `.0` when it is integral
pub fn format_number(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}", value as i64)
  } else {
    format!("{value}")
  }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Header row plus data rows, every row padded to the header width
#[derive(Debug, Clone, Default)]
pub struct Sheet {
  headers: Vec<String>,
  rows: Vec<Vec<Cell>>,
}

impl Sheet {
  /// Build a sheet from already-typed rows, the first of which is taken
  /// as the header after skipping `header_row` rows.
  pub fn from_rows(raw: Vec<Vec<Cell>>, header_row: usize) -> Option<Self> {
    let mut rows = raw.into_iter().skip(header_row);
    let header_cells = rows.next()?;
    let headers: Vec<String> = header_cells
      .iter()
      .enumerate()
      .map(|(i, cell)| match cell {
        Cell::Empty => format!("Unnamed: {i}"),
        other => other.as_text(),
      })
      .collect();

    let width = headers.len();
    let rows = rows
      .filter(|row| row.iter().any(|cell| !cell.is_empty()))
      .map(|mut row| {
        row.resize(width, Cell::Empty);
        row
      })
      .collect();

    Some(Self { headers, rows })
  }

  /// Load a workbook or CSV file, choosing the reader by file extension
  pub fn from_path(path: &Path, header_row: usize) -> Result<Self, SheetError> {
    let extension =
      path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).unwrap_or_default();

    match extension.as_str() {
      "csv" => {
        let file = File::open(path)
          .map_err(|e| SheetError::Open { path: path.to_path_buf(), message: e.to_string() })?;
        let sheet = Self::from_csv_reader(file, header_row)?;
        sheet.ok_or(SheetError::MissingHeader { path: path.to_path_buf(), row: header_row })
      }
      "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::from_workbook(path, header_row),
      other => Err(SheetError::UnsupportedFormat(other.to_string())),
    }
  }

  /// Parse CSV content; returns `None` when the header row does not exist
  pub fn from_csv_reader<R: Read>(reader: R, header_row: usize) -> Result<Option<Self>, SheetError> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);

    let mut raw = Vec::new();
    for record in csv_reader.records() {
      let record = record?;
      raw.push(record.iter().map(Cell::parse).collect());
    }
    Ok(Self::from_rows(raw, header_row))
  }

  fn from_workbook(path: &Path, header_row: usize) -> Result<Self, SheetError> {
    let mut workbook = open_workbook_auto(path)
      .map_err(|e| SheetError::Open { path: path.to_path_buf(), message: e.to_string() })?;

    let range = workbook
      .worksheet_range_at(0)
      .ok_or_else(|| SheetError::NoWorksheet { path: path.to_path_buf() })?
      .map_err(|e| SheetError::Open { path: path.to_path_buf(), message: e.to_string() })?;

    let raw = range.rows().map(|row| row.iter().map(convert_workbook_cell).collect()).collect();
    Self::from_rows(raw, header_row)
      .ok_or(SheetError::MissingHeader { path: path.to_path_buf(), row: header_row })
  }

  pub fn headers(&self) -> &[String] {
    &self.headers
  }

  pub fn rows(&self) -> &[Vec<Cell>] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Case-insensitive lookup of a trimmed column name
  pub fn column_index(&self, name: &str) -> Option<usize> {
    let wanted = name.trim();
    self
      .headers
      .iter()
      .position(|h| h == wanted)
      .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(wanted)))
  }

  /// Names from `required` that the header row lacks
  pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
    required.iter().filter(|name| self.column_index(name).is_none()).map(|s| s.to_string()).collect()
  }

  /// True when every non-empty cell in the column is numeric
  pub fn is_numeric_column(&self, column: usize) -> bool {
    let mut seen_number = false;
    for row in &self.rows {
      match &row[column] {
        Cell::Number(_) => seen_number = true,
        Cell::Text(_) => return false,
        Cell::Empty => {}
      }
    }
    seen_number
  }

  /// Cell at `row`/`column`; out-of-range positions read as empty
  pub fn cell(&self, row: usize, column: usize) -> &Cell {
    self.rows.get(row).and_then(|r| r.get(column)).unwrap_or(&EMPTY_CELL)
  }

  /// Cell for a named column
  pub fn value(&self, row: usize, column: &str) -> &Cell {
    match self.column_index(column) {
      Some(index) => self.cell(row, index),
      None => &EMPTY_CELL,
    }
  }
}

fn convert_workbook_cell(data: &Data) -> Cell {
  match data {
    Data::Empty => Cell::Empty,
    Data::Int(value) => Cell::Number(*value as f64),
    Data::Float(value) if value.is_finite() => Cell::Number(*value),
    Data::Float(_) => Cell::Empty,
    Data::Bool(value) => Cell::Text(value.to_string()),
    Data::DateTime(value) => Cell::Number(value.as_f64()),
    Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::parse(text),
    Data::Error(_) => Cell::Empty,
  }
}
