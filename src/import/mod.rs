//! Stock count spreadsheet importer.
//!
//! Reads the first sheet of an Excel file, resolves localized headers, and
//! applies each valid row as an independent update against a stock count.
//! Partial success is a normal outcome; the summary reports both sides.

mod decode;
mod error;
mod headers;
mod rows;
mod summary;

pub use decode::{decode_first_sheet, Cell};
pub use error::ImportError;
pub use rows::RowCandidate;
pub use summary::ImportSummary;

use futures::stream::{FuturesUnordered, StreamExt};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::ImportConfig;
use crate::inventory::client::CountUpdater;

use headers::resolve_columns;
use rows::extract_rows;

/// File suffixes accepted for import. Matching is case-sensitive.
const SUPPORTED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// Result of a completed batch.
#[derive(Debug, Clone)]
pub struct ImportReport {
  pub summary: ImportSummary,
  /// Set when the stock count should be re-read after this delay
  pub reload_after: Option<Duration>,
}

/// Applies spreadsheet rows to a stock count through a [`CountUpdater`].
pub struct Importer<U: CountUpdater> {
  updater: U,
  reload_delay: Duration,
}

impl<U: CountUpdater> Importer<U> {
  pub fn new(updater: U, config: &ImportConfig) -> Self {
    Self {
      updater,
      reload_delay: config.reload_delay(),
    }
  }

  /// Validate, decode and apply a spreadsheet file to stock count `count_id`.
  ///
  /// Every validation and decode failure happens before the first remote
  /// call, so an `Err` means nothing was changed on the server.
  pub async fn decode_and_reconcile(
    &self,
    file: Option<&Path>,
    count_id: u64,
  ) -> Result<ImportReport, ImportError> {
    let path = file.ok_or(ImportError::NoFile)?;
    check_extension(path)?;

    let bytes = tokio::fs::read(path).await?;
    let grid = decode_first_sheet(bytes)?;
    info!(file = %path.display(), rows = grid.len(), "Decoded import sheet");

    self.reconcile_grid(count_id, &grid).await
  }

  /// Apply an already decoded grid.
  pub async fn reconcile_grid(
    &self,
    count_id: u64,
    grid: &[Vec<Cell>],
  ) -> Result<ImportReport, ImportError> {
    let candidates = plan(grid)?;
    Ok(self.apply(count_id, candidates).await)
  }

  /// Send all ready rows at once and wait for every one to settle.
  async fn apply(&self, count_id: u64, candidates: Vec<RowCandidate>) -> ImportReport {
    let mut summary = ImportSummary::default();
    let mut ready = Vec::new();

    for candidate in candidates {
      match candidate {
        RowCandidate::Ready(row) => ready.push(row),
        RowCandidate::Rejected {
          part_number,
          reason,
        } => summary.record_failure(&part_number, &reason),
      }
    }

    let mut updates: FuturesUnordered<_> = ready
      .iter()
      .map(|row| async move { (row, self.updater.update_by_part(count_id, row).await) })
      .collect();

    while let Some((row, result)) = updates.next().await {
      match result {
        Ok(response) if response.success => summary.record_success(),
        Ok(response) => summary.record_failure(
          &row.part_number,
          response.error.as_deref().unwrap_or("unknown error"),
        ),
        Err(e) => summary.record_failure(&row.part_number, &e.to_string()),
      }
    }

    info!(
      count_id,
      succeeded = summary.success_count,
      failed = summary.failure_count,
      "Import batch settled"
    );

    let reload_after = summary.needs_reload().then_some(self.reload_delay);
    ImportReport {
      summary,
      reload_after,
    }
  }
}

/// Validate a grid and extract its candidates without sending anything.
pub fn plan(grid: &[Vec<Cell>]) -> Result<Vec<RowCandidate>, ImportError> {
  if grid.len() < 2 {
    return Err(ImportError::NoData);
  }

  let columns = resolve_columns(&grid[0])?;
  let candidates = extract_rows(grid, &columns);
  if candidates.is_empty() {
    return Err(ImportError::NothingToImport);
  }

  Ok(candidates)
}

fn check_extension(path: &Path) -> Result<(), ImportError> {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy())
    .unwrap_or_default();

  if SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(*ext)) {
    Ok(())
  } else {
    Err(ImportError::UnsupportedExtension(name.into_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::decode::Grid;
  use super::*;
  use crate::inventory::types::{ImportRow, UpdateResponse};
  use color_eyre::{eyre::eyre, Result};
  use futures::future::BoxFuture;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  enum Reply {
    Accept,
    Reject(&'static str),
    Fail(&'static str),
  }

  const DEFAULT_REPLY: (u64, Reply) = (0, Reply::Accept);

  /// Updater that answers from a script, after a per-part delay.
  #[derive(Default)]
  struct ScriptedUpdater {
    replies: HashMap<String, (u64, Reply)>,
    calls: AtomicUsize,
    sent: Mutex<Vec<ImportRow>>,
  }

  impl ScriptedUpdater {
    fn reply(mut self, part: &str, delay_ms: u64, reply: Reply) -> Self {
      self.replies.insert(part.to_string(), (delay_ms, reply));
      self
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl CountUpdater for ScriptedUpdater {
    fn update_by_part<'a>(
      &'a self,
      count_id: u64,
      row: &'a ImportRow,
    ) -> BoxFuture<'a, Result<UpdateResponse>> {
      Box::pin(async move {
        assert_eq!(count_id, 42);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(row.clone());

        let (delay_ms, reply) = self
          .replies
          .get(&row.part_number)
          .unwrap_or(&DEFAULT_REPLY);
        tokio::time::sleep(Duration::from_millis(*delay_ms)).await;

        match reply {
          Reply::Accept => Ok(UpdateResponse::ok()),
          Reply::Reject(error) => Ok(UpdateResponse::rejected(*error)),
          Reply::Fail(error) => Err(eyre!("{}", error)),
        }
      })
    }
  }

  fn importer(updater: ScriptedUpdater) -> Importer<ScriptedUpdater> {
    Importer::new(updater, &ImportConfig::default())
  }

  fn grid(rows: &[&[&str]]) -> Grid {
    rows
      .iter()
      .map(|row| row.iter().map(|c| Cell::text(*c)).collect())
      .collect()
  }

  const HEADER: &[&str] = &["零件編號", "實盤數量", "備註"];

  #[tokio::test]
  async fn test_partial_failure_is_aggregated() {
    let updater = ScriptedUpdater::default()
      .reply("P1", 40, Reply::Accept)
      .reply("P2", 30, Reply::Reject("Part not found: P2"))
      .reply("P3", 20, Reply::Accept)
      .reply("P4", 10, Reply::Fail("connection reset"))
      .reply("P5", 0, Reply::Accept);
    let importer = importer(updater);

    let report = importer
      .reconcile_grid(
        42,
        &grid(&[
          HEADER,
          &["P1", "1", ""],
          &["P2", "2", ""],
          &["P3", "3", ""],
          &["P4", "4", ""],
          &["P5", "5", ""],
        ]),
      )
      .await
      .unwrap();

    assert_eq!(importer.updater.calls(), 5);
    assert_eq!(report.summary.success_count, 3);
    assert_eq!(report.summary.failure_count, 2);
    // Recorded as calls complete, not in sheet order
    assert_eq!(
      report.summary.failures,
      vec!["P4: connection reset", "P2: Part not found: P2"]
    );
    assert_eq!(report.reload_after, Some(Duration::from_millis(3000)));
  }

  #[tokio::test]
  async fn test_total_failure_schedules_no_reload() {
    let updater = ScriptedUpdater::default()
      .reply("P1", 0, Reply::Reject("Count item not found for part: P1"))
      .reply("P2", 0, Reply::Fail("timed out"));
    let importer = importer(updater);

    let report = importer
      .reconcile_grid(42, &grid(&[HEADER, &["P1", "1", ""], &["P2", "2", ""]]))
      .await
      .unwrap();

    assert_eq!(report.summary.success_count, 0);
    assert_eq!(report.summary.failure_count, 2);
    assert_eq!(report.reload_after, None);
  }

  #[tokio::test]
  async fn test_missing_column_sends_nothing() {
    let importer = importer(ScriptedUpdater::default());

    let result = importer
      .reconcile_grid(
        42,
        &grid(&[&["Part Number", "System Quantity"], &["P1", "5"]]),
      )
      .await;

    assert!(matches!(result, Err(ImportError::MissingColumns(_))));
    assert_eq!(importer.updater.calls(), 0);
  }

  #[tokio::test]
  async fn test_header_only_sheet_has_no_data() {
    let importer = importer(ScriptedUpdater::default());

    let result = importer.reconcile_grid(42, &grid(&[HEADER])).await;

    assert!(matches!(result, Err(ImportError::NoData)));
    assert_eq!(importer.updater.calls(), 0);
  }

  #[tokio::test]
  async fn test_rows_without_quantity_leave_nothing_to_import() {
    let importer = importer(ScriptedUpdater::default());

    let result = importer
      .reconcile_grid(42, &grid(&[HEADER, &["P1", "", "n/a"], &["P2", "", ""]]))
      .await;

    assert!(matches!(result, Err(ImportError::NothingToImport)));
    assert_eq!(importer.updater.calls(), 0);
  }

  #[tokio::test]
  async fn test_bad_quantity_is_rejected_without_a_call() {
    let importer = importer(ScriptedUpdater::default());

    let report = importer
      .reconcile_grid(
        42,
        &grid(&[
          &["part_number", "counted_quantity", "notes"],
          &["P1", "abc", ""],
          &["P2", " 5 ", " shelf 3 "],
        ]),
      )
      .await
      .unwrap();

    assert_eq!(importer.updater.calls(), 1);
    assert_eq!(
      *importer.updater.sent.lock().unwrap(),
      vec![ImportRow {
        part_number: "P2".to_string(),
        counted_quantity: 5,
        notes: "shelf 3".to_string(),
      }]
    );
    assert_eq!(report.summary.success_count, 1);
    assert_eq!(
      report.summary.failures,
      vec!["P1: counted quantity 'abc' is not a number"]
    );
  }

  #[tokio::test]
  async fn test_file_preconditions() {
    let importer = importer(ScriptedUpdater::default());

    assert!(matches!(
      importer.decode_and_reconcile(None, 42).await,
      Err(ImportError::NoFile)
    ));

    for name in ["counts.csv", "counts.XLSX", "counts.xlsx.bak"] {
      let result = importer.decode_and_reconcile(Some(Path::new(name)), 42).await;
      assert!(
        matches!(result, Err(ImportError::UnsupportedExtension(ref n)) if n == name),
        "{name}"
      );
    }

    assert_eq!(importer.updater.calls(), 0);
  }

  #[tokio::test]
  async fn test_workbook_on_disk_is_reconciled() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, label) in HEADER.iter().enumerate() {
      sheet.write_string(0, col as u16, *label).unwrap();
    }
    sheet.write_string(1, 0, "P1").unwrap();
    sheet.write_number(1, 1, 8.0).unwrap();
    sheet.write_string(1, 2, "top shelf").unwrap();
    sheet.write_number(2, 0, 10025.0).unwrap();
    sheet.write_string(2, 1, "3").unwrap();
    workbook
      .add_worksheet()
      .write_string(1, 0, "P9")
      .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.xlsx");
    std::fs::write(&path, workbook.save_to_buffer().unwrap()).unwrap();

    let importer = importer(ScriptedUpdater::default());
    let report = importer.decode_and_reconcile(Some(&path), 42).await.unwrap();

    let mut sent = importer.updater.sent.lock().unwrap().clone();
    sent.sort_by(|a, b| a.part_number.cmp(&b.part_number));
    assert_eq!(
      sent,
      vec![
        ImportRow {
          part_number: "10025".to_string(),
          counted_quantity: 3,
          notes: String::new(),
        },
        ImportRow {
          part_number: "P1".to_string(),
          counted_quantity: 8,
          notes: "top shelf".to_string(),
        },
      ]
    );
    assert_eq!(report.summary.success_count, 2);
    assert!(report.reload_after.is_some());
  }

  #[tokio::test]
  async fn test_unreadable_files() {
    let importer = importer(ScriptedUpdater::default());
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.xlsx");
    assert!(matches!(
      importer.decode_and_reconcile(Some(&missing), 42).await,
      Err(ImportError::Io(_))
    ));

    let corrupt = dir.path().join("corrupt.xls");
    std::fs::write(&corrupt, b"not a spreadsheet").unwrap();
    assert!(matches!(
      importer.decode_and_reconcile(Some(&corrupt), 42).await,
      Err(ImportError::Decode(_))
    ));

    assert_eq!(importer.updater.calls(), 0);
  }
}
