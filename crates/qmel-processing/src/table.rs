//! In-memory notification table.
//!
//! A [`Table`] pairs a polars `DataFrame` with the [`Schema`] of its columns.
//! The two are kept in lockstep: the frame's columns are always exactly the
//! schema's columns, in schema order.

use polars::prelude::*;

use crate::error::{ProcessingError, Result, ResultExt};
use crate::schema::{Schema, SemanticType};

/// Columnar buffer owned by a single pipeline run.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
    schema: Schema,
}

impl Table {
    /// Wrap a frame, checking that its columns match the schema.
    pub fn new(schema: Schema, df: DataFrame) -> Result<Self> {
        let frame_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        if frame_names != schema.names() {
            return Err(ProcessingError::InvalidConfig(format!(
                "frame columns {:?} do not match schema {:?}",
                frame_names,
                schema.names()
            )));
        }
        Ok(Self { df, schema })
    }

    /// Build an all-string table from accepted rows.
    ///
    /// Every row must have exactly one value per schema column.
    pub fn from_rows(schema: Schema, rows: &[Vec<String>]) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.len());

        for (idx, col) in schema.columns().iter().enumerate() {
            let mut values: Vec<Option<String>> = Vec::with_capacity(rows.len());
            for row in rows {
                let value = row.get(idx).ok_or_else(|| {
                    ProcessingError::InvalidConfig(format!(
                        "row has {} values, schema needs {}",
                        row.len(),
                        schema.len()
                    ))
                })?;
                values.push(Some(value.clone()));
            }
            columns.push(Column::from(Series::new(col.name.as_str().into(), values)));
        }

        let df = DataFrame::new(columns).context("Building table from parsed rows")?;
        Ok(Self { df, schema })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn data_frame(&self) -> &DataFrame {
        &self.df
    }

    /// Materialized series for a column.
    pub fn column(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))
    }

    /// Replace a column's values. The series length must equal the height.
    pub fn replace_column(&mut self, name: &str, series: Series) -> Result<()> {
        if !self.schema.contains(name) {
            return Err(ProcessingError::ColumnNotFound(name.to_string()));
        }
        let series = series.with_name(name.into());
        self.df
            .replace(name, series)
            .context(format!("Replacing column '{}'", name))?;
        Ok(())
    }

    /// Remove columns from both the frame and the schema.
    pub fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.schema.remove(names);
        let keep: Vec<PlSmallStr> = self.schema.names().into_iter().map(PlSmallStr::from).collect();
        self.df = self.df.select(keep).context("Dropping columns")?;
        Ok(())
    }

    /// Keep only rows where `mask` is true.
    pub fn filter_rows(&mut self, mask: &BooleanChunked) -> Result<()> {
        self.df = self.df.filter(mask).context("Filtering rows")?;
        Ok(())
    }

    /// Per-cell missing flags for a column: null, or blank text.
    pub fn missing_mask(&self, name: &str) -> Result<Vec<bool>> {
        let series = self.column(name)?;
        if series.dtype() == &DataType::String {
            let values = series.str()?;
            Ok(values
                .into_iter()
                .map(|v| v.is_none_or(|s| s.trim().is_empty()))
                .collect())
        } else {
            let nulls = series.is_null();
            Ok(nulls.into_iter().map(|v| v.unwrap_or(true)).collect())
        }
    }

    pub fn missing_count(&self, name: &str) -> Result<usize> {
        Ok(self.missing_mask(name)?.into_iter().filter(|m| *m).count())
    }

    /// Total missing cells across the whole table.
    pub fn total_missing(&self) -> Result<usize> {
        let mut total = 0;
        for name in self.schema.names() {
            total += self.missing_count(name)?;
        }
        Ok(total)
    }

    /// Drop rows whose `key` column is null or blank. Returns the number
    /// of rows removed.
    pub fn retain_rows_with_key(&mut self, key: &str) -> Result<usize> {
        let missing = self.missing_mask(key)?;
        let removed = missing.iter().filter(|m| **m).count();
        if removed > 0 {
            let keep: Vec<bool> = missing.iter().map(|m| !m).collect();
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            self.filter_rows(&mask)?;
        }
        Ok(removed)
    }

    /// Names of columns of a semantic type that are still present.
    pub fn columns_of(&self, ty: SemanticType) -> Vec<String> {
        self.schema
            .columns_of(ty)
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Text value of one cell, `None` for null. Non-string columns are
    /// rendered through their display form.
    pub fn cell_str(&self, name: &str, row: usize) -> Result<Option<String>> {
        let series = self.column(name)?;
        let value = series.get(row)?;
        Ok(match value {
            AnyValue::Null => None,
            AnyValue::String(s) => Some(s.to_string()),
            AnyValue::StringOwned(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        })
    }
}
