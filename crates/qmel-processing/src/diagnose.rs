//! Read-only inspection of a raw dump.
//!
//! The [`Diagnoser`] runs the same line classification as the pipeline but
//! builds no table and writes nothing. It answers "why did my run reject so
//! many lines?" before a run is attempted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::config::{DEFAULT_SAMPLE_SIZE, ParsingMode};
use crate::error::Result;
use crate::ingest::{LineClassifier, LineOutcome, MalformedLine, read_source, source_lines};
use crate::schema::Schema;

/// One raw line shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleLine {
    /// 1-based line number.
    pub line_number: usize,
    pub content: String,
}

/// Findings of a diagnostic pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub parsing_mode: ParsingMode,
    pub total_lines: usize,
    /// The first lines of the source, whatever their kind.
    pub sample_lines: Vec<SampleLine>,
    pub skipped_lines: usize,
    pub header_lines: usize,
    pub accepted_lines: usize,
    pub rejected_lines: usize,
    pub malformed_samples: Vec<MalformedLine>,
    /// Number of tokenized lines per observed field count.
    pub field_count_histogram: BTreeMap<usize, usize>,
}

impl DiagnosisReport {
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Parsing mode: {}", self.parsing_mode.display_name()),
            format!("Total lines: {}", self.total_lines),
            format!(
                "Accepted: {}, rejected: {}, skipped: {}, headers: {}",
                self.accepted_lines, self.rejected_lines, self.skipped_lines, self.header_lines
            ),
        ];

        if !self.sample_lines.is_empty() {
            lines.push(format!("First {} lines:", self.sample_lines.len()));
            for sample in &self.sample_lines {
                lines.push(format!("  {:>5}: {}", sample.line_number, sample.content));
            }
        }

        if !self.field_count_histogram.is_empty() {
            lines.push("Field counts:".to_string());
            for (count, lines_with) in &self.field_count_histogram {
                lines.push(format!("  {:>3} fields: {} lines", count, lines_with));
            }
        }

        if !self.malformed_samples.is_empty() {
            lines.push(format!("Incorrect lines (first {}):", self.malformed_samples.len()));
            for m in &self.malformed_samples {
                lines.push(format!(
                    "  line {} ({}, {} fields): {}",
                    m.offset + 1,
                    m.reason,
                    m.field_count,
                    m.content
                ));
            }
        }
        lines
    }
}

/// Counts and samples the lines of a raw dump without modifying it.
#[derive(Debug, Clone)]
pub struct Diagnoser {
    classifier: LineClassifier,
    mode: ParsingMode,
    sample_size: usize,
}

impl Diagnoser {
    pub fn new(schema: Schema, mode: ParsingMode, sample_size: usize) -> Self {
        Self {
            classifier: LineClassifier::new(schema, mode),
            mode,
            sample_size,
        }
    }

    /// Diagnoser for the notification schema with default sampling.
    pub fn qmel(mode: ParsingMode) -> Self {
        Self::new(Schema::qmel(), mode, DEFAULT_SAMPLE_SIZE)
    }

    pub fn diagnose_path(&self, path: &Path) -> Result<DiagnosisReport> {
        info!("Diagnosing {}", path.display());
        let text = read_source(path)?;
        Ok(self.diagnose(&text))
    }

    pub fn diagnose(&self, text: &str) -> DiagnosisReport {
        let mut report = DiagnosisReport {
            parsing_mode: self.mode,
            ..DiagnosisReport::default()
        };

        for (offset, raw) in source_lines(text) {
            report.total_lines += 1;
            if report.sample_lines.len() < self.sample_size {
                report.sample_lines.push(SampleLine {
                    line_number: offset + 1,
                    content: raw.to_string(),
                });
            }

            let outcome = self.classifier.classify(raw, offset);
            if let Some(count) = self.classifier.field_count(&outcome) {
                *report.field_count_histogram.entry(count).or_insert(0) += 1;
            }

            match outcome {
                LineOutcome::Skipped => report.skipped_lines += 1,
                LineOutcome::Header => report.header_lines += 1,
                LineOutcome::Accepted(_) => report.accepted_lines += 1,
                LineOutcome::Malformed(line) => {
                    report.rejected_lines += 1;
                    if report.malformed_samples.len() < self.sample_size {
                        report.malformed_samples.push(line);
                    }
                }
            }
        }

        info!(
            "{} lines: {} accepted, {} incorrect",
            report.total_lines, report.accepted_lines, report.rejected_lines
        );
        report
    }
}
