//! Ingestion: raw text to an all-string [`Table`].
//!
//! Each line is tokenized by [`LineParser`] and checked by
//! [`SchemaValidator`]. Bad lines never abort the run; they are counted in the
//! [`DiagnosticReport`] and the loop moves on.

mod parser;
mod validator;

pub use parser::{DELIMITER, LineParser, MalformedLine, ParsedLine, RejectReason};
pub use validator::{SchemaValidator, Validated};

/// Byte order mark some exporters put in front of the first line.
const BOM: char = '\u{feff}';

use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ParsingMode;
use crate::error::{ProcessingError, Result};
use crate::report::DiagnosticReport;
use crate::schema::Schema;
use crate::table::Table;

/// Outcome of running one line through parser and validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Skipped,
    Header,
    Accepted(Vec<String>),
    Malformed(MalformedLine),
}

/// Parser and validator configured for one parsing mode.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    parser: LineParser,
    validator: SchemaValidator,
}

impl LineClassifier {
    pub fn new(schema: Schema, mode: ParsingMode) -> Self {
        Self {
            parser: LineParser::new(mode, schema.len()),
            validator: SchemaValidator::new(schema),
        }
    }

    pub fn schema(&self) -> &Schema {
        self.validator.schema()
    }

    pub fn classify(&self, raw: &str, offset: usize) -> LineOutcome {
        match self.parser.parse(raw, offset) {
            ParsedLine::Skipped => LineOutcome::Skipped,
            ParsedLine::Malformed(m) => LineOutcome::Malformed(m),
            ParsedLine::Fields(fields) => match self.validator.validate(fields, offset, raw) {
                Validated::Accepted(fields) => LineOutcome::Accepted(fields),
                Validated::Header => LineOutcome::Header,
                Validated::Rejected(m) => LineOutcome::Malformed(m),
            },
        }
    }

    /// Number of fields the tokenizer produced for a classified line.
    /// `None` when the line was never split into fields.
    pub fn field_count(&self, outcome: &LineOutcome) -> Option<usize> {
        match outcome {
            LineOutcome::Skipped => None,
            LineOutcome::Header => Some(self.schema().len()),
            LineOutcome::Accepted(fields) => Some(fields.len()),
            LineOutcome::Malformed(m) => match m.reason {
                RejectReason::SchemaMismatch => Some(m.field_count),
                RejectReason::DecorationMismatch => None,
            },
        }
    }
}

/// Lines of the source with their 0-based offsets. A leading byte order mark
/// is dropped from the first line.
pub fn source_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.strip_prefix(BOM).unwrap_or(text).lines().enumerate()
}

/// Read the whole input file. The only blocking read of a run.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ProcessingError::file_access(path, e))
}

/// Build the string table from raw text, filling the ingest counters of
/// `report`.
///
/// Returns [`ProcessingError::EmptyInput`] when no line was accepted.
pub fn ingest(
    text: &str,
    classifier: &LineClassifier,
    sample_size: usize,
    report: &mut DiagnosticReport,
) -> Result<Table> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (offset, raw) in source_lines(text) {
        report.total_lines += 1;
        match classifier.classify(raw, offset) {
            LineOutcome::Skipped => report.skipped_lines += 1,
            LineOutcome::Header => {
                report.header_lines += 1;
                debug!("Line {} is a column header, skipping", offset);
            }
            LineOutcome::Accepted(fields) => rows.push(fields),
            LineOutcome::Malformed(line) => {
                if report.rejected_lines < sample_size {
                    warn!(
                        "Line {} rejected ({}): {} fields - Content: {}",
                        line.offset, line.reason, line.field_count, line.content
                    );
                }
                report.record_rejected(line, sample_size);
            }
        }
    }

    report.accepted_lines = rows.len();
    info!("Total lines read: {}", report.total_lines);
    info!(
        "Accepted {} lines, rejected {}, skipped {}",
        report.accepted_lines, report.rejected_lines, report.skipped_lines
    );
    if report.rejected_lines > sample_size {
        warn!(
            "{} more rejected lines not shown",
            report.rejected_lines - sample_size
        );
    }

    if rows.is_empty() {
        warn!("No valid data found in the input");
        return Err(ProcessingError::EmptyInput {
            total_lines: report.total_lines,
        });
    }

    Table::from_rows(classifier.schema().clone(), &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(values: &[&str]) -> String {
        format!("|{}|", values.join("|"))
    }

    fn twenty(prefix: &str) -> Vec<String> {
        (0..20).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_ingest_counts_each_kind_of_line() {
        let good = twenty("a");
        let good_refs: Vec<&str> = good.iter().map(|s| s.as_str()).collect();
        let text = [
            "-----------".to_string(),
            line(&crate::schema::QMEL_COLUMNS.map(|(n, _)| n)),
            "-----------".to_string(),
            line(&good_refs),
            String::new(),
            line(&good_refs[..18]),
            line(&good_refs),
        ]
        .join("\n");

        let classifier = LineClassifier::new(Schema::qmel(), ParsingMode::PipeTable);
        let mut report = DiagnosticReport::new();
        let table = ingest(&text, &classifier, 10, &mut report).unwrap();

        assert_eq!(report.total_lines, 7);
        assert_eq!(report.skipped_lines, 3);
        assert_eq!(report.header_lines, 1);
        assert_eq!(report.accepted_lines, 2);
        assert_eq!(report.rejected_lines, 1);
        assert_eq!(report.rejected_samples[0].offset, 5);
        assert_eq!(report.rejected_samples[0].field_count, 18);
        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), 20);
    }

    #[test]
    fn test_ingest_without_valid_rows_is_empty_input() {
        let classifier = LineClassifier::new(Schema::qmel(), ParsingMode::PipeTable);
        let mut report = DiagnosticReport::new();
        let result = ingest("|a|b|\n----\n", &classifier, 10, &mut report);

        match result {
            Err(ProcessingError::EmptyInput { total_lines }) => assert_eq!(total_lines, 2),
            other => panic!("Expected EmptyInput, got {:?}", other.map(|t| t.height())),
        }
        assert_eq!(report.rejected_lines, 1);
    }

    #[test]
    fn test_ingest_strips_byte_order_mark() {
        let good = twenty("a");
        let good_refs: Vec<&str> = good.iter().map(|s| s.as_str()).collect();
        let text = format!("\u{feff}{}\n{}", line(&good_refs), line(&good_refs));

        let classifier = LineClassifier::new(Schema::qmel(), ParsingMode::PipeTable);
        let mut report = DiagnosticReport::new();
        let table = ingest(&text, &classifier, 10, &mut report).unwrap();

        assert_eq!(report.accepted_lines, 2);
        assert_eq!(report.rejected_lines, 0);
        assert_eq!(table.cell_str("MANDT", 0).unwrap(), Some("a0".to_string()));
    }

    #[test]
    fn test_field_count_of_each_outcome() {
        let classifier = LineClassifier::new(Schema::qmel(), ParsingMode::PipeTable);
        let good = twenty("a");
        let good_refs: Vec<&str> = good.iter().map(|s| s.as_str()).collect();

        let accepted = classifier.classify(&line(&good_refs), 0);
        let short = classifier.classify(&line(&good_refs[..7]), 1);
        let undecorated = classifier.classify("Page 1 of 1", 2);
        let separator = classifier.classify("-----", 3);

        assert_eq!(classifier.field_count(&accepted), Some(20));
        assert_eq!(classifier.field_count(&short), Some(7));
        assert_eq!(classifier.field_count(&undecorated), None);
        assert_eq!(classifier.field_count(&separator), None);
    }

    #[test]
    fn test_read_source_missing_file() {
        let err = read_source(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ACCESS_FAILURE");
    }
}
