//! Run diagnostics.
//!
//! Every recoverable condition of a run ends up here so that quality loss
//! stays auditable even when the run succeeds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProcessingError, Result};
use crate::ingest::MalformedLine;

/// Counts and samples accumulated over one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Every line of the source, including blanks and separators.
    pub total_lines: usize,
    /// Blank, separator and non-data decoration lines.
    pub skipped_lines: usize,
    /// Repeated column header lines.
    pub header_lines: usize,
    pub accepted_lines: usize,
    pub rejected_lines: usize,
    /// The first `sample_size` rejected lines.
    pub rejected_samples: Vec<MalformedLine>,

    /// Accepted rows dropped because the primary key was empty.
    pub rows_without_key: usize,
    /// Non-empty cells that failed to parse as their column's type.
    pub coercion_failures: BTreeMap<String, usize>,

    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,

    /// Numeric columns with no observed value; their gaps stay empty.
    pub undefined_mean_columns: Vec<String>,
    pub imputed_cells: BTreeMap<String, usize>,

    pub rows_written: usize,
    pub columns_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a rejected line, keeping it verbatim while under the sample cap.
    pub fn record_rejected(&mut self, line: MalformedLine, sample_size: usize) {
        self.rejected_lines += 1;
        if self.rejected_samples.len() < sample_size {
            self.rejected_samples.push(line);
        }
    }

    pub fn record_coercion_failures(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.coercion_failures.entry(column.to_string()).or_insert(0) += count;
        }
    }

    pub fn record_imputed(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.imputed_cells.entry(column.to_string()).or_insert(0) += count;
        }
    }

    pub fn total_coercion_failures(&self) -> usize {
        self.coercion_failures.values().sum()
    }

    pub fn total_imputed(&self) -> usize {
        self.imputed_cells.values().sum()
    }

    /// Short multi-line summary for logs and the CLI.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Lines read: {}", self.total_lines),
            format!(
                "Lines accepted: {} (skipped {}, headers {}, rejected {})",
                self.accepted_lines, self.skipped_lines, self.header_lines, self.rejected_lines
            ),
        ];
        if self.rows_without_key > 0 {
            lines.push(format!("Rows without key removed: {}", self.rows_without_key));
        }
        if !self.coercion_failures.is_empty() {
            lines.push(format!(
                "Unparseable cells set to null: {}",
                self.total_coercion_failures()
            ));
        }
        if self.dropped_columns.is_empty() {
            lines.push("Columns dropped: none".to_string());
        } else {
            lines.push(format!(
                "Columns dropped: {} {:?}",
                self.dropped_columns.len(),
                self.dropped_columns
            ));
        }
        lines.push(format!("Rows dropped: {}", self.dropped_rows));
        lines.push(format!("Cells imputed: {}", self.total_imputed()));
        if !self.undefined_mean_columns.is_empty() {
            lines.push(format!(
                "Columns left with gaps (no values to average): {:?}",
                self.undefined_mean_columns
            ));
        }
        lines.push(format!(
            "Rows written: {} x {} columns",
            self.rows_written, self.columns_written
        ));
        lines
    }

    /// Write the report as pretty JSON into `dir` as `<stem>_report.json`.
    pub fn write_json(&self, dir: &Path, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| ProcessingError::file_access(dir, e))?;
        let path = dir.join(format!("{}_report.json", stem));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| ProcessingError::file_access(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RejectReason;

    fn malformed(offset: usize) -> MalformedLine {
        MalformedLine {
            offset,
            field_count: 18,
            reason: RejectReason::SchemaMismatch,
            content: "|a|b|".to_string(),
        }
    }

    #[test]
    fn test_record_rejected_caps_samples() {
        let mut report = DiagnosticReport::new();
        for i in 0..5 {
            report.record_rejected(malformed(i), 2);
        }
        assert_eq!(report.rejected_lines, 5);
        assert_eq!(report.rejected_samples.len(), 2);
        assert_eq!(report.rejected_samples[1].offset, 1);
    }

    #[test]
    fn test_counters_ignore_zero() {
        let mut report = DiagnosticReport::new();
        report.record_coercion_failures("ERDAT", 0);
        report.record_coercion_failures("ERDAT", 2);
        report.record_coercion_failures("ERDAT", 1);
        report.record_imputed("ARTPR", 0);
        assert_eq!(report.coercion_failures.get("ERDAT"), Some(&3));
        assert!(report.imputed_cells.is_empty());
    }

    #[test]
    fn test_write_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = DiagnosticReport::new();
        report.total_lines = 4;
        report.dropped_columns.push("QMTXT".to_string());

        let path = report.write_json(dir.path(), "raw").unwrap();
        assert!(path.ends_with("raw_report.json"));

        let loaded: DiagnosticReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }
}
