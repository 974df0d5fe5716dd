//! Configuration types for the cleaning pipeline.
//!
//! Every tunable of a run lives in [`PipelineConfig`]; components receive it
//! (or the part they need) at construction instead of reading globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ProcessingError, Result};
use crate::schema::PRIMARY_KEY;

/// Default missing-fraction threshold for dropping columns and rows.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Default number of sample lines kept by diagnostics.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// How decorated lines of the raw dump are split into fields.
///
/// The two source dumps differ in decoration, so the mode is always chosen
/// explicitly and never guessed from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMode {
    /// `|f1|f2|...|f20|`: strip one delimiter at each end and split.
    #[default]
    PipeTable,
    /// SAP list output `| |001 |f2 |...|`: only lines with a leading empty
    /// cell followed by a 3-digit client are data; the first two and the
    /// last cell are dropped and every field is trimmed.
    SapList,
}

impl ParsingMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PipeTable => "generic pipe-table",
            Self::SapList => "SAP-notification",
        }
    }
}

/// Configuration for one pipeline run.
///
/// Use [`PipelineConfig::builder()`] for a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use qmel_processing::config::{PipelineConfig, ParsingMode};
///
/// let config = PipelineConfig::builder()
///     .threshold(0.5)
///     .parsing_mode(ParsingMode::SapList)
///     .output_path("out/cleaned.csv")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum tolerated missing fraction (0.0 - 1.0) before a column or
    /// row is dropped instead of repaired.
    /// Default: 0.6
    pub threshold: f64,

    /// Line decoration convention of the input.
    /// Default: PipeTable
    pub parsing_mode: ParsingMode,

    /// How many rejected lines (and sample lines, for diagnostics) are kept
    /// verbatim in the report.
    /// Default: 10
    pub sample_size: usize,

    /// Where the cleaned CSV is written.
    /// Default: "cleaned_data.csv"
    pub output_path: PathBuf,

    /// Column whose empty values disqualify a row.
    /// Default: "QMNUM"
    pub primary_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            parsing_mode: ParsingMode::default(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            output_path: PathBuf::from("cleaned_data.csv"),
            primary_key: PRIMARY_KEY.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProcessingError::file_access(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| ProcessingError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigValidationError::InvalidThreshold(self.threshold));
        }

        if self.sample_size == 0 {
            return Err(ConfigValidationError::InvalidSampleSize(self.sample_size));
        }

        if self.primary_key.trim().is_empty() {
            return Err(ConfigValidationError::EmptyPrimaryKey);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidThreshold(f64),

    #[error("Invalid sample size: {0} (must be at least 1)")]
    InvalidSampleSize(usize),

    #[error("Primary key column name must not be empty")]
    EmptyPrimaryKey,
}

impl From<ConfigValidationError> for ProcessingError {
    fn from(e: ConfigValidationError) -> Self {
        ProcessingError::InvalidConfig(e.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    threshold: Option<f64>,
    parsing_mode: Option<ParsingMode>,
    sample_size: Option<usize>,
    output_path: Option<PathBuf>,
    primary_key: Option<String>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON) so
    /// individual fields can be overridden.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            threshold: Some(config.threshold),
            parsing_mode: Some(config.parsing_mode),
            sample_size: Some(config.sample_size),
            output_path: Some(config.output_path),
            primary_key: Some(config.primary_key),
        }
    }

    /// Set the missing-fraction threshold.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.6 = 60%)
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn parsing_mode(mut self, mode: ParsingMode) -> Self {
        self.parsing_mode = Some(mode);
        self
    }

    pub fn sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            parsing_mode: self.parsing_mode.unwrap_or(defaults.parsing_mode),
            sample_size: self.sample_size.unwrap_or(defaults.sample_size),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            primary_key: self.primary_key.unwrap_or(defaults.primary_key),
        };

        config.validate()?;
        Ok(config)
    }
}
