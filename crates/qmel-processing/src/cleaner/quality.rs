//! Threshold-based removal of sparse columns and rows.

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::DEFAULT_THRESHOLD;
use crate::error::Result;
use crate::report::DiagnosticReport;
use crate::table::Table;

/// What a filtering pass removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,
}

/// Drops columns, then rows, whose missing fraction is strictly greater than
/// the threshold.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    threshold: f64,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl QualityFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run the filter over `table` and record what was removed.
    pub fn apply(&self, table: &mut Table, report: &mut DiagnosticReport) -> Result<FilterOutcome> {
        info!("Filtering sparse columns and rows (threshold {})...", self.threshold);

        Self::unify_blank_strings(table)?;

        let outcome = FilterOutcome {
            dropped_columns: self.drop_sparse_columns(table)?,
            dropped_rows: self.drop_sparse_rows(table)?,
        };

        if outcome.dropped_columns.is_empty() {
            info!("No columns above the missing threshold");
        } else {
            info!(
                "Dropped {} columns: {:?}",
                outcome.dropped_columns.len(),
                outcome.dropped_columns
            );
        }
        info!("Dropped {} rows", outcome.dropped_rows);

        report.dropped_columns.extend(outcome.dropped_columns.iter().cloned());
        report.dropped_rows += outcome.dropped_rows;
        Ok(outcome)
    }

    /// Empty and whitespace-only strings become null so that every column
    /// has a single notion of "missing".
    pub fn unify_blank_strings(table: &mut Table) -> Result<()> {
        let names: Vec<String> = table.schema().names().iter().map(|s| s.to_string()).collect();
        for name in names {
            let series = table.column(&name)?;
            if series.dtype() != &DataType::String {
                continue;
            }
            let values = series.str()?;
            let blanks = values
                .into_iter()
                .filter(|v| v.is_some_and(|s| s.trim().is_empty()))
                .count();
            if blanks == 0 {
                continue;
            }

            let unified: Vec<Option<&str>> = values
                .into_iter()
                .map(|v| v.filter(|s| !s.trim().is_empty()))
                .collect();
            let unified = Series::new(name.as_str().into(), unified);
            table.replace_column(&name, unified)?;
        }
        Ok(())
    }

    fn drop_sparse_columns(&self, table: &mut Table) -> Result<Vec<String>> {
        let rows = table.height();
        if rows == 0 || table.width() == 0 {
            return Ok(Vec::new());
        }

        let mut to_drop = Vec::new();
        for name in table.schema().names() {
            let missing = table.missing_count(name)?;
            let fraction = missing as f64 / rows as f64;
            debug!("Column '{}' missing fraction {:.3}", name, fraction);
            if fraction > self.threshold {
                to_drop.push(name.to_string());
            }
        }

        table.drop_columns(&to_drop)?;
        Ok(to_drop)
    }

    fn drop_sparse_rows(&self, table: &mut Table) -> Result<usize> {
        let rows = table.height();
        let columns = table.width();
        if rows == 0 || columns == 0 {
            return Ok(0);
        }

        let mut missing_per_row = vec![0usize; rows];
        for name in table.schema().names() {
            for (row, missing) in table.missing_mask(name)?.into_iter().enumerate() {
                if missing {
                    missing_per_row[row] += 1;
                }
            }
        }

        let keep: Vec<bool> = missing_per_row
            .iter()
            .map(|m| (*m as f64 / columns as f64) <= self.threshold)
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            table.filter_rows(&mask)?;
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, Schema, SemanticType};

    fn text_table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let schema = Schema::new(
            columns
                .iter()
                .map(|c| ColumnDef::new(*c, SemanticType::Text))
                .collect(),
        );
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        Table::from_rows(schema, &rows).unwrap()
    }

    // ========================================================================
    // Column dropping
    // ========================================================================

    #[test]
    fn test_column_above_threshold_dropped() {
        // B is missing in 7 of 10 rows
        let mut rows: Vec<[&str; 2]> = (0..3).map(|_| ["k", "v"]).collect();
        rows.extend((0..7).map(|_| ["k", ""]));
        let refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let mut table = text_table(&["A", "B"], &refs);
        let mut report = DiagnosticReport::new();

        let outcome = QualityFilter::new(0.6).apply(&mut table, &mut report).unwrap();

        assert_eq!(outcome.dropped_columns, vec!["B".to_string()]);
        assert_eq!(table.schema().names(), vec!["A"]);
        assert_eq!(report.dropped_columns, vec!["B".to_string()]);
        // the surviving column is fully observed, so no rows go
        assert_eq!(outcome.dropped_rows, 0);
    }

    #[test]
    fn test_fraction_equal_to_threshold_kept() {
        // B is missing in exactly half the rows
        let mut table = text_table(&["A", "B"], &[&["k", "v"], &["k", ""]]);
        let mut report = DiagnosticReport::new();

        let outcome = QualityFilter::new(0.5).apply(&mut table, &mut report).unwrap();

        assert!(outcome.dropped_columns.is_empty());
        assert_eq!(table.width(), 2);
        assert_eq!(outcome.dropped_rows, 0);
    }

    // ========================================================================
    // Row dropping
    // ========================================================================

    #[test]
    fn test_row_above_threshold_dropped() {
        let mut table = text_table(
            &["A", "B", "C", "D", "E"],
            &[
                &["a", "b", "c", "d", "e"],
                &["a", "", " ", "", "e"],
                &["a", "b", "c", "d", "e"],
                &["a", "b", "", "d", "e"],
            ],
        );
        let mut report = DiagnosticReport::new();

        let outcome = QualityFilter::new(0.5).apply(&mut table, &mut report).unwrap();

        assert!(outcome.dropped_columns.is_empty());
        assert_eq!(outcome.dropped_rows, 1);
        assert_eq!(table.height(), 3);
        assert_eq!(report.dropped_rows, 1);
    }

    #[test]
    fn test_rows_measured_against_surviving_columns() {
        // C is dropped first, after which row 1 has 1 missing of 2 columns
        let mut table = text_table(
            &["A", "B", "C"],
            &[&["a", "b", ""], &["a", "", ""], &["a", "b", ""]],
        );
        let mut report = DiagnosticReport::new();

        let outcome = QualityFilter::new(0.6).apply(&mut table, &mut report).unwrap();

        assert_eq!(outcome.dropped_columns, vec!["C".to_string()]);
        assert_eq!(outcome.dropped_rows, 0);
        assert_eq!(table.height(), 3);
    }

    #[test]
    fn test_blank_strings_become_null() {
        let mut table = text_table(&["A"], &[&["x"], &["  "], &[""]]);
        QualityFilter::unify_blank_strings(&mut table).unwrap();
        assert_eq!(table.column("A").unwrap().null_count(), 2);
    }

    #[test]
    fn test_empty_table_untouched() {
        let mut table = text_table(&["A", "B"], &[]);
        let mut report = DiagnosticReport::new();
        let outcome = QualityFilter::default().apply(&mut table, &mut report).unwrap();
        assert_eq!(outcome, FilterOutcome::default());
        assert_eq!(table.width(), 2);
    }
}
