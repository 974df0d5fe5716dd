//! Error types for the notification cleaning pipeline.
//!
//! Only whole-run failures live here. Per-line and per-cell problems
//! (malformed lines, unparseable values, columns without a mean) are not
//! errors: they are collected into the [`DiagnosticReport`](crate::report::DiagnosticReport)
//! and the run continues.
//!
//! Errors serialize as `{ code, message }` so the `--json` output can carry
//! them alongside a report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// No line survived parsing and schema validation.
    #[error("No valid data: {total_lines} lines read, none matched the notification schema")]
    EmptyInput { total_lines: usize },

    /// Lines passed the schema but every one of them lacks the primary key.
    #[error("No valid data: all {rows_without_key} accepted rows have an empty '{column}'")]
    NoKeyedRows {
        column: String,
        rows_without_key: usize,
    },

    /// The input could not be read or the output could not be written.
    #[error("Cannot access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Handing the finished table to the downstream sink failed.
    #[error("Failed to push table '{table}' into pool '{pool}': {reason}")]
    DownstreamPush {
        pool: String,
        table: String,
        reason: String,
    },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an io error together with the path it concerns.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessingError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } => "EMPTY_INPUT",
            Self::NoKeyedRows { .. } => "NO_KEYED_ROWS",
            Self::FileAccess { .. } => "FILE_ACCESS_FAILURE",
            Self::DownstreamPush { .. } => "DOWNSTREAM_PUSH_FAILURE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the run ended without output but nothing is broken
    /// (an input with no usable rows, or a bad configuration).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EmptyInput { .. } | Self::NoKeyedRows { .. } | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Check if this error is a "no usable rows" condition: nothing passed
    /// the schema, or nothing that passed carries a primary key.
    pub fn is_empty_input(&self) -> bool {
        match self {
            Self::EmptyInput { .. } | Self::NoKeyedRows { .. } => true,
            Self::WithContext { source, .. } => source.is_empty_input(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::EmptyInput { total_lines: 3 }.error_code(),
            "EMPTY_INPUT"
        );
        assert_eq!(
            ProcessingError::ColumnNotFound("QMNUM".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_no_keyed_rows_names_key_column() {
        let error = ProcessingError::NoKeyedRows {
            column: "QMNUM".to_string(),
            rows_without_key: 4,
        };
        let message = error.to_string();
        assert!(message.contains("QMNUM"));
        assert!(message.contains('4'));
        assert!(!message.contains("schema"));
        assert_eq!(error.error_code(), "NO_KEYED_ROWS");
        assert!(error.is_empty_input());
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ProcessingError::EmptyInput { total_lines: 0 }.is_recoverable());
        assert!(ProcessingError::InvalidConfig("bad".to_string()).is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!ProcessingError::file_access("raw.txt", io).is_recoverable());
    }

    #[test]
    fn test_file_access_message_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = ProcessingError::file_access("/data/raw.txt", io);
        let message = error.to_string();
        assert!(message.contains("/data/raw.txt"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::DownstreamPush {
            pool: "test1".to_string(),
            table: "TestTable".to_string(),
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("DOWNSTREAM_PUSH_FAILURE"));
        assert!(json.contains("TestTable"));
    }

    #[test]
    fn test_with_context_preserves_code() {
        let error = ProcessingError::EmptyInput { total_lines: 7 }.with_context("Ingesting raw.txt");
        assert!(error.to_string().contains("Ingesting raw.txt"));
        assert_eq!(error.error_code(), "EMPTY_INPUT");
        assert!(error.is_empty_input());
    }
}
