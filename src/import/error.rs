use thiserror::Error;

use super::headers::Field;

/// Reasons an import stops before any remote update is sent.
#[derive(Debug, Error)]
pub enum ImportError {
  #[error("no file selected for import")]
  NoFile,

  #[error("unsupported file '{0}': upload an Excel file (.xlsx or .xls)")]
  UnsupportedExtension(String),

  #[error("failed to read file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to decode spreadsheet: {0}")]
  Decode(String),

  #[error("the spreadsheet has no data rows")]
  NoData,

  #[error("missing required columns: {}", list_fields(.0))]
  MissingColumns(Vec<Field>),

  #[error("nothing to import: make sure the counted quantity column is filled in")]
  NothingToImport,
}

fn list_fields(fields: &[Field]) -> String {
  fields
    .iter()
    .map(|f| f.to_string())
    .collect::<Vec<_>>()
    .join(", ")
}
