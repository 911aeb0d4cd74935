//! Spreadsheet decoding into an array-of-arrays grid.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use super::error::ImportError;

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Empty,
  Text(String),
  Number(f64),
  Bool(bool),
}

/// Rows of cells; row 0 is the header row.
pub type Grid = Vec<Vec<Cell>>;

impl Cell {
  pub fn text(s: impl Into<String>) -> Self {
    Self::Text(s.into())
  }

  /// Missing or an empty string.
  pub fn is_blank(&self) -> bool {
    match self {
      Self::Empty => true,
      Self::Text(s) => s.is_empty(),
      _ => false,
    }
  }

  /// Text form of the cell. Whole numbers render without a fraction.
  pub fn to_text(&self) -> String {
    match self {
      Self::Empty => String::new(),
      Self::Text(s) => s.clone(),
      Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
      Self::Number(n) => n.to_string(),
      Self::Bool(b) => b.to_string(),
    }
  }
}

impl From<&Data> for Cell {
  fn from(data: &Data) -> Self {
    match data {
      Data::Empty => Cell::Empty,
      Data::String(s) => Cell::text(s.as_str()),
      Data::Float(f) => Cell::Number(*f),
      Data::Int(i) => Cell::Number(*i as f64),
      Data::Bool(b) => Cell::Bool(*b),
      other => Cell::Text(other.to_string()),
    }
  }
}

/// Decode the first worksheet of an `.xlsx`/`.xls` file.
pub fn decode_first_sheet(bytes: Vec<u8>) -> Result<Grid, ImportError> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
    .map_err(|e| ImportError::Decode(e.to_string()))?;

  let range = workbook
    .worksheet_range_at(0)
    .ok_or_else(|| ImportError::Decode("workbook has no worksheets".to_string()))?
    .map_err(|e| ImportError::Decode(e.to_string()))?;

  Ok(
    range
      .rows()
      .map(|row| row.iter().map(Cell::from).collect())
      .collect(),
  )
}
