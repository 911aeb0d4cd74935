//! Header row resolution.
//!
//! Each field may be headed by a localized label or one of two English
//! spellings. Matching is exact: case-sensitive and untrimmed.

use std::fmt;

use super::decode::Cell;
use super::error::ImportError;

/// Semantic columns of a stock count sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  PartNumber,
  CountedQuantity,
  Notes,
}

impl Field {
  pub fn labels(&self) -> &'static [&'static str] {
    match self {
      Self::PartNumber => &["零件編號", "part_number", "Part Number"],
      Self::CountedQuantity => &["實盤數量", "counted_quantity", "Counted Quantity"],
      Self::Notes => &["備註", "notes", "Notes"],
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Localized label first, then the snake_case one
    let labels = self.labels();
    write!(f, "{} ({})", labels[0], labels[1])
  }
}

/// Column index of each field in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
  pub part_number: usize,
  pub counted_quantity: usize,
  pub notes: Option<usize>,
}

/// First column whose header is one of the field's labels.
pub fn find_column(headers: &[Cell], field: Field) -> Option<usize> {
  headers.iter().position(|cell| match cell {
    Cell::Text(s) => field.labels().contains(&s.as_str()),
    _ => false,
  })
}

/// Resolve all columns, failing if a mandatory one is absent.
pub fn resolve_columns(headers: &[Cell]) -> Result<ColumnMap, ImportError> {
  let part_number = find_column(headers, Field::PartNumber);
  let counted_quantity = find_column(headers, Field::CountedQuantity);

  match (part_number, counted_quantity) {
    (Some(part_number), Some(counted_quantity)) => Ok(ColumnMap {
      part_number,
      counted_quantity,
      notes: find_column(headers, Field::Notes),
    }),
    (part_number, counted_quantity) => {
      let mut missing = Vec::new();
      if part_number.is_none() {
        missing.push(Field::PartNumber);
      }
      if counted_quantity.is_none() {
        missing.push(Field::CountedQuantity);
      }
      Err(ImportError::MissingColumns(missing))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(labels: &[&str]) -> Vec<Cell> {
    labels.iter().map(|l| Cell::text(*l)).collect()
  }

  #[test]
  fn test_every_alternative_resolves_to_same_index() {
    for field in [Field::PartNumber, Field::CountedQuantity, Field::Notes] {
      for label in field.labels() {
        let row = header(&["位置", "Description", *label]);
        assert_eq!(find_column(&row, field), Some(2), "label {label}");
      }
    }
  }

  #[test]
  fn test_matching_is_exact() {
    let row = header(&["Part number", " part_number", "PART_NUMBER", "counted quantity"]);
    assert_eq!(find_column(&row, Field::PartNumber), None);
    assert_eq!(find_column(&row, Field::CountedQuantity), None);
  }

  #[test]
  fn test_mixed_languages() {
    let row = header(&["零件編號", "名稱", "Counted Quantity", "備註"]);
    assert_eq!(
      resolve_columns(&row).unwrap(),
      ColumnMap {
        part_number: 0,
        counted_quantity: 2,
        notes: Some(3),
      }
    );
  }

  #[test]
  fn test_notes_column_is_optional() {
    let row = header(&["part_number", "counted_quantity"]);
    assert_eq!(resolve_columns(&row).unwrap().notes, None);
  }

  #[test]
  fn test_missing_quantity_column() {
    let row = header(&["part_number", "system_quantity", "notes"]);
    match resolve_columns(&row) {
      Err(ImportError::MissingColumns(missing)) => {
        assert_eq!(missing, vec![Field::CountedQuantity])
      }
      other => panic!("expected missing column, got {other:?}"),
    }
  }

  #[test]
  fn test_missing_both_columns_names_both() {
    let err = resolve_columns(&header(&["notes"])).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("part_number"));
    assert!(message.contains("counted_quantity"));
  }
}
