//! Batch reconciliation summary.

use std::fmt::Write;

/// Aggregate outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub success_count: usize,
  pub failure_count: usize,
  /// Row-identified failure messages in the order they were recorded
  pub failures: Vec<String>,
}

impl ImportSummary {
  pub fn record_success(&mut self) {
    self.success_count += 1;
  }

  pub fn record_failure(&mut self, part_number: &str, error: &str) {
    self.failure_count += 1;
    self.failures.push(format!("{}: {}", part_number, error));
  }

  /// Something reached the server, so its state is worth re-reading.
  pub fn needs_reload(&self) -> bool {
    self.success_count > 0
  }

  /// Plain-text report, showing at most `max_errors` failure messages.
  pub fn render(&self, max_errors: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
      out,
      "Import finished: {} succeeded / {} failed",
      self.success_count, self.failure_count
    );

    if !self.failures.is_empty() {
      let _ = writeln!(out, "Errors:");
      for failure in self.failures.iter().take(max_errors) {
        let _ = writeln!(out, "  - {}", failure);
      }
      if self.failures.len() > max_errors {
        let _ = writeln!(out, "  ... and {} more", self.failures.len() - max_errors);
      }
    }

    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn summary_with_failures(n: usize) -> ImportSummary {
    let mut summary = ImportSummary::default();
    summary.record_success();
    for i in 0..n {
      summary.record_failure(&format!("P{i}"), "Part not found");
    }
    summary
  }

  #[test]
  fn test_render_lists_failures() {
    let summary = summary_with_failures(2);
    assert_eq!(
      summary.render(20),
      "Import finished: 1 succeeded / 2 failed\n\
       Errors:\n  - P0: Part not found\n  - P1: Part not found\n"
    );
  }

  #[test]
  fn test_render_caps_failures() {
    let summary = summary_with_failures(25);
    let rendered = summary.render(20);

    assert_eq!(rendered.matches("  - ").count(), 20);
    assert!(rendered.contains("  - P19: Part not found"));
    assert!(!rendered.contains("P20:"));
    assert!(rendered.ends_with("  ... and 5 more\n"));
  }

  #[test]
  fn test_clean_run_has_no_error_section() {
    let mut summary = ImportSummary::default();
    summary.record_success();
    assert_eq!(summary.render(20), "Import finished: 1 succeeded / 0 failed\n");
  }

  #[test]
  fn test_reload_needs_a_success() {
    assert!(!ImportSummary::default().needs_reload());
    assert!(summary_with_failures(0).needs_reload());
  }
}
