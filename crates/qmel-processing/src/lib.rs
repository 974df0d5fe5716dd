//! QMEL Notification Cleaning Library
//!
//! Turns pipe-decorated text dumps of SAP maintenance notifications (table
//! QMEL, 20 positional columns) into a clean, typed CSV, built on Polars.
//!
//! # Overview
//!
//! A run goes through these stages, each recording what it did in a
//! [`DiagnosticReport`]:
//!
//! - **Ingest**: tokenize each line by [`ParsingMode`], keep lines with
//!   exactly 20 fields, count and sample the rest
//! - **Type Coercion**: `dd.mm.yyyy` dates, `hh:mm:ss` times and numeric
//!   columns; unparseable cells become null
//! - **Quality Filtering**: drop columns, then rows, whose missing fraction
//!   exceeds the threshold
//! - **Imputation**: mean for numeric columns, first-seen mode otherwise
//! - **Normalization**: upper-case categorical columns
//! - **Output**: CSV with ISO dates
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use qmel_processing::{ParsingMode, Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::builder()
//!     .parsing_mode(ParsingMode::PipeTable)
//!     .threshold(0.6)
//!     .output_path("cleaned_data.csv")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(Path::new("raw_data.txt"))?;
//!
//! println!("Rejected lines: {}", result.report.rejected_lines);
//! println!("Dropped columns: {:?}", result.report.dropped_columns);
//! ```
//!
//! # Diagnosing a dump
//!
//! ```rust,ignore
//! use qmel_processing::{Diagnoser, ParsingMode};
//!
//! let report = Diagnoser::qmel(ParsingMode::SapList).diagnose_path(Path::new("raw.txt"))?;
//! for line in report.summary_lines() {
//!     println!("{}", line);
//! }
//! ```

pub mod cleaner;
pub mod collaborators;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod imputers;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;
pub mod utils;
pub mod writer;

// Re-exports for convenient access
pub use cleaner::{FilterOutcome, Normalizer, QualityFilter, TypeCoercer};
pub use collaborators::{ArtifactMover, DirectorySink, FsMover, TableSink, unique_table_name};
pub use config::{ConfigValidationError, ParsingMode, PipelineConfig, PipelineConfigBuilder};
pub use diagnose::{Diagnoser, DiagnosisReport, SampleLine};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use imputers::{ColumnImputation, Imputer};
pub use ingest::{LineClassifier, LineOutcome, LineParser, MalformedLine, RejectReason, SchemaValidator};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineResult, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use report::DiagnosticReport;
pub use schema::{ColumnDef, PRIMARY_KEY, QMEL_COLUMNS, Schema, SemanticType};
pub use table::Table;
pub use writer::CsvWriter;
