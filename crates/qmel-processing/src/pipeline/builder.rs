//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating a run from raw dump to cleaned CSV.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::cleaner::{Normalizer, QualityFilter, TypeCoercer};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::imputers::Imputer;
use crate::ingest::{LineClassifier, ingest, read_source};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::report::DiagnosticReport;
use crate::schema::Schema;
use crate::table::Table;
use crate::writer::CsvWriter;

/// Outcome of a completed run.
#[derive(Debug)]
pub struct PipelineResult {
    /// The cleaned table, as written.
    pub table: Table,
    pub report: DiagnosticReport,
    pub output_path: PathBuf,
    pub duration_ms: u64,
}

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use qmel_processing::{Pipeline, PipelineConfig, ParsingMode};
///
/// let config = PipelineConfig::builder()
///     .parsing_mode(ParsingMode::SapList)
///     .output_path("cleaned_data.csv")
///     .build()?;
///
/// let result = Pipeline::builder()
///     .config(config)
///     .build()?
///     .run(Path::new("raw.txt"))?;
///
/// for line in result.report.summary_lines() {
///     println!("{}", line);
/// }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    classifier: LineClassifier,
    coercer: TypeCoercer,
    filter: QualityFilter,
    imputer: Imputer,
    normalizer: Normalizer,
    writer: CsvWriter,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read `input`, clean it and write the CSV to the configured output
    /// path.
    ///
    /// # Errors
    ///
    /// [`ProcessingError::EmptyInput`] when no line survives parsing and
    /// [`ProcessingError::NoKeyedRows`] when no accepted row has a primary
    /// key; nothing is written in either case.
    /// [`ProcessingError::FileAccess`] when the input cannot be read or the
    /// output cannot be written.
    pub fn run(&self, input: &Path) -> Result<PipelineResult> {
        match self.run_internal(input) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Run every in-memory stage on raw text: ingest, primary-key filter,
    /// coercion, quality filtering, imputation and normalization.
    pub fn clean(&self, text: &str) -> Result<(Table, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Ingesting,
            0.0,
            format!("Parsing lines ({} mode)...", self.config.parsing_mode.display_name()),
        ));
        info!("Step 1: Parsing lines...");
        let mut table = ingest(text, &self.classifier, self.config.sample_size, &mut report)?;

        let removed = table
            .retain_rows_with_key(&self.config.primary_key)
            .context("Removing rows without primary key")?;
        report.rows_without_key = removed;
        if removed > 0 {
            info!(
                "Removed {} rows with empty '{}'",
                removed, self.config.primary_key
            );
        }
        if table.height() == 0 {
            return Err(ProcessingError::NoKeyedRows {
                column: self.config.primary_key.clone(),
                rows_without_key: removed,
            });
        }
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Ingesting,
            1.0,
            format!("Accepted {} rows", table.height()),
        ));

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Coercing,
            0.0,
            "Coercing column types...",
        ));
        info!("Step 2: Coercing types...");
        self.coercer.coerce(&mut table, &mut report)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            0.0,
            "Dropping sparse columns and rows...",
        ));
        info!("Step 3: Filtering by missing threshold...");
        let outcome = self.filter.apply(&mut table, &mut report)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            1.0,
            format!(
                "Dropped {} columns and {} rows",
                outcome.dropped_columns.len(),
                outcome.dropped_rows
            ),
        ));

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Imputing,
            0.0,
            "Imputing missing values...",
        ));
        info!("Step 4: Imputing missing values...");
        self.imputer.impute(&mut table, &mut report)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            0.0,
            "Normalizing categorical columns...",
        ));
        info!("Step 5: Normalizing...");
        self.normalizer.normalize(&mut table)?;

        Ok((table, report))
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, input: &Path) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline on {}", input.display());

        let text = read_source(input)?;
        let (table, mut report) = self.clean(&text)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Writing,
            0.0,
            "Writing cleaned CSV...",
        ));
        info!("Step 6: Writing output...");
        let output_path = self.config.output_path.clone();
        report.rows_written = self.writer.write(&table, &output_path)?;
        report.columns_written = table.width();
        report.output_path = Some(output_path.clone());

        for line in report.summary_lines() {
            info!("{}", line);
        }

        Ok(PipelineResult {
            table,
            report,
            output_path,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    schema: Option<Schema>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the notification schema. Mostly useful in tests.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let pipeline = Pipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}",
    ///             update.progress * 100.0,
    ///             update.stage,
    ///             update.message
    ///         );
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let schema = self.schema.unwrap_or_default();

        Ok(Pipeline {
            classifier: LineClassifier::new(schema, config.parsing_mode),
            filter: QualityFilter::new(config.threshold),
            config,
            progress_reporter: self.progress_reporter,
            coercer: TypeCoercer::new(),
            imputer: Imputer::new(),
            normalizer: Normalizer::new(),
            writer: CsvWriter::new(),
        })
    }
}
