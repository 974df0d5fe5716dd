//! CSV serialization of a cleaned [`Table`].

use polars::prelude::{CsvWriter as FrameCsvWriter, *};
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

use crate::error::{ProcessingError, Result, ResultExt};
use crate::table::Table;
use crate::utils::{OUTPUT_DATE_FORMAT, TIME_FORMAT, days_to_date, nanos_to_time};

/// Writes a table as comma-separated text with a header row.
///
/// Dates are rendered `%Y-%m-%d`, times `%H:%M:%S`, missing values as empty
/// fields. Column order is the table's schema order.
#[derive(Debug, Clone, Copy)]
pub struct CsvWriter {
    separator: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `table` to `path`, creating the parent directory if needed.
    /// Returns the number of data rows written.
    pub fn write(&self, table: &Table, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ProcessingError::file_access(parent, e))?;
        }

        let mut file = File::create(path).map_err(|e| ProcessingError::file_access(path, e))?;
        let mut frame = Self::render_frame(table)?;
        FrameCsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.separator)
            .with_quote_char(b'"')
            .with_null_value(String::new())
            .finish(&mut frame)
            .context(format!("Writing CSV to {}", path.display()))?;

        info!(
            "Wrote {} rows x {} columns to {}",
            frame.height(),
            frame.width(),
            path.display()
        );
        Ok(frame.height())
    }

    /// Copy of the table's frame with temporal columns rendered as text in
    /// the output formats.
    fn render_frame(table: &Table) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(table.width());
        for name in table.schema().names() {
            let series = table.column(name)?;
            let rendered = match series.dtype() {
                DataType::Date => {
                    let physical = series.to_physical_repr();
                    let text: Vec<Option<String>> = physical
                        .i32()?
                        .into_iter()
                        .map(|d| {
                            d.and_then(days_to_date)
                                .map(|date| date.format(OUTPUT_DATE_FORMAT).to_string())
                        })
                        .collect();
                    Series::new(series.name().clone(), text)
                }
                DataType::Time => {
                    let physical = series.to_physical_repr();
                    let text: Vec<Option<String>> = physical
                        .i64()?
                        .into_iter()
                        .map(|t| {
                            t.and_then(nanos_to_time)
                                .map(|time| time.format(TIME_FORMAT).to_string())
                        })
                        .collect();
                    Series::new(series.name().clone(), text)
                }
                _ => series.clone(),
            };
            columns.push(Column::from(rendered));
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::TypeCoercer;
    use crate::report::DiagnosticReport;
    use crate::schema::{ColumnDef, Schema, SemanticType};
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        let schema = Schema::new(vec![
            ColumnDef::new("QMNUM", SemanticType::Identifier),
            ColumnDef::new("ARTPR", SemanticType::Numeric),
            ColumnDef::new("ERDAT", SemanticType::Date),
            ColumnDef::new("MZEIT", SemanticType::Time),
        ]);
        let rows = vec![
            vec![
                "10000".to_string(),
                "10.5".to_string(),
                "01.02.2023".to_string(),
                "08:30:00".to_string(),
            ],
            vec![
                "10001".to_string(),
                "".to_string(),
                "".to_string(),
                "23:59:59".to_string(),
            ],
        ];
        let mut table = Table::from_rows(schema, &rows).unwrap();
        TypeCoercer::new()
            .coerce(&mut table, &mut DiagnosticReport::new())
            .unwrap();
        table
    }

    #[test]
    fn test_write_formats_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cleaned.csv");

        let rows = CsvWriter::new().write(&table(), &path).unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "QMNUM,ARTPR,ERDAT,MZEIT",
                "10000,10.5,2023-02-01,08:30:00",
                "10001,,,23:59:59",
            ]
        );
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        std::fs::write(&path, "stale\ncontent\nwith\nmore\nlines\n").unwrap();

        CsvWriter::new().write(&table(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("QMNUM,ARTPR,ERDAT,MZEIT\n"));
        assert_eq!(content.lines().count(), 3);
    }
}
