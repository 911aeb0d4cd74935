//! Data row extraction.

use crate::inventory::types::ImportRow;

use super::decode::Cell;
use super::headers::ColumnMap;

/// A data row that had both a part number and a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowCandidate {
  /// Valid, to be sent to the server
  Ready(ImportRow),
  /// Quantity could not be used; never sent
  Rejected { part_number: String, reason: String },
}

/// Turn the data rows of a sheet into import candidates.
///
/// Rows without a part number or without a quantity are dropped silently.
/// Rows whose quantity is not a non-negative integer are kept as rejections
/// so they show up in the summary.
pub fn extract_rows(grid: &[Vec<Cell>], columns: &ColumnMap) -> Vec<RowCandidate> {
  grid
    .iter()
    .skip(1)
    .filter(|row| !row.iter().all(Cell::is_blank))
    .filter_map(|row| extract_row(row, columns))
    .collect()
}

fn extract_row(row: &[Cell], columns: &ColumnMap) -> Option<RowCandidate> {
  let part = row.get(columns.part_number).filter(|c| !c.is_blank())?;
  let quantity = row.get(columns.counted_quantity).filter(|c| !c.is_blank())?;

  let part_number = part.to_text().trim().to_string();
  if part_number.is_empty() {
    return None;
  }

  let notes = columns
    .notes
    .and_then(|i| row.get(i))
    .map(|c| c.to_text().trim().to_string())
    .unwrap_or_default();

  let candidate = match coerce_quantity(quantity) {
    Some(counted_quantity) if counted_quantity >= 0 => RowCandidate::Ready(ImportRow {
      part_number,
      counted_quantity,
      notes,
    }),
    Some(counted_quantity) => RowCandidate::Rejected {
      part_number,
      reason: format!("counted quantity {} is negative", counted_quantity),
    },
    None => RowCandidate::Rejected {
      part_number,
      reason: format!("counted quantity '{}' is not a number", quantity.to_text()),
    },
  };

  Some(candidate)
}

/// Integer value of a quantity cell. Numbers are truncated; text is read
/// like `parseInt`, taking the leading decimal digits.
pub fn coerce_quantity(cell: &Cell) -> Option<i64> {
  match cell {
    Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
    Cell::Text(s) => parse_leading_int(s),
    _ => None,
  }
}

fn parse_leading_int(s: &str) -> Option<i64> {
  let s = s.trim_start();
  let (negative, rest) = match s.as_bytes().first() {
    Some(b'-') => (true, &s[1..]),
    Some(b'+') => (false, &s[1..]),
    _ => (false, s),
  };

  let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
  if digits_len == 0 {
    return None;
  }

  let value: i64 = rest[..digits_len].parse().ok()?;
  Some(if negative { -value } else { value })
}
