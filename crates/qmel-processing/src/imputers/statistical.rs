//! Statistical imputation methods.
//!
//! Numeric columns are filled with their mean, everything else with its mode.

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, ResultExt};
use crate::report::DiagnosticReport;
use crate::schema::SemanticType;
use crate::table::Table;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, first_seen_mode, string_mode};

/// Result of imputing a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnImputation {
    /// Nothing was missing.
    Complete,
    /// `count` cells were filled.
    Filled { count: usize, method: &'static str },
    /// A numeric column with no observed value; it is left with its gaps.
    UndefinedMean,
    /// A non-numeric column with no observed value.
    NoObservedValues,
}

/// Fills missing cells column by column according to the semantic type.
#[derive(Debug, Default, Clone, Copy)]
pub struct Imputer;

impl Imputer {
    pub fn new() -> Self {
        Self
    }

    /// Impute every surviving column and record the fills in `report`.
    pub fn impute(&self, table: &mut Table, report: &mut DiagnosticReport) -> Result<()> {
        info!("Imputing missing values...");

        let columns: Vec<(String, SemanticType)> = table
            .schema()
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.semantic_type))
            .collect();

        for (name, ty) in columns {
            let outcome = match ty {
                SemanticType::Numeric => Self::apply_numeric_mean(table, &name),
                SemanticType::Date | SemanticType::Time => {
                    Self::apply_temporal_mode(table, &name, ty)
                }
                SemanticType::Identifier | SemanticType::Text | SemanticType::Currency => {
                    Self::apply_mode_imputation(table, &name)
                }
            }
            .context(format!("Imputing column '{}'", name))?;

            match outcome {
                ColumnImputation::Complete => {}
                ColumnImputation::Filled { count, method } => {
                    debug!("Filled {} cells of '{}' with {}", count, name, method);
                    report.record_imputed(&name, count);
                }
                ColumnImputation::UndefinedMean => {
                    warn!("Column '{}' has no numeric values; mean is undefined", name);
                    report.undefined_mean_columns.push(name);
                }
                ColumnImputation::NoObservedValues => {
                    debug!("Column '{}' has no observed values, left as is", name);
                }
            }
        }

        info!("Imputed {} cells", report.total_imputed());
        Ok(())
    }

    /// Fill a Float64 column with the mean of its observed values.
    pub fn apply_numeric_mean(table: &mut Table, name: &str) -> Result<ColumnImputation> {
        let series = table.column(name)?;
        let missing = series.null_count();
        if missing == 0 {
            return Ok(ColumnImputation::Complete);
        }

        let Some(mean) = series.mean() else {
            return Ok(ColumnImputation::UndefinedMean);
        };

        let filled = fill_numeric_nulls(series, mean)?;
        table.replace_column(name, filled)?;
        Ok(ColumnImputation::Filled {
            count: missing,
            method: "mean",
        })
    }

    /// Fill a String column with its most frequent value.
    pub fn apply_mode_imputation(table: &mut Table, name: &str) -> Result<ColumnImputation> {
        let series = table.column(name)?;
        let missing = series.null_count();
        if missing == 0 {
            return Ok(ColumnImputation::Complete);
        }

        let Some(mode) = string_mode(series) else {
            return Ok(ColumnImputation::NoObservedValues);
        };

        let filled = fill_string_nulls(series, &mode)?;
        table.replace_column(name, filled)?;
        Ok(ColumnImputation::Filled {
            count: missing,
            method: "mode",
        })
    }

    /// Fill a Date or Time column with its most frequent value.
    pub fn apply_temporal_mode(
        table: &mut Table,
        name: &str,
        ty: SemanticType,
    ) -> Result<ColumnImputation> {
        let series = table.column(name)?;
        let missing = series.null_count();
        if missing == 0 {
            return Ok(ColumnImputation::Complete);
        }

        let physical = series.to_physical_repr().cast(&DataType::Int64)?;
        let values = physical.i64()?;
        let Some(mode) = first_seen_mode(values.into_iter().flatten()) else {
            return Ok(ColumnImputation::NoObservedValues);
        };

        let filled: Vec<Option<i64>> = values.into_iter().map(|v| Some(v.unwrap_or(mode))).collect();
        let filled = Series::new(series.name().clone(), filled);
        let filled = match ty {
            SemanticType::Date => filled.cast(&DataType::Int32)?.cast(&DataType::Date)?,
            _ => filled.cast(&DataType::Time)?,
        };

        table.replace_column(name, filled)?;
        Ok(ColumnImputation::Filled {
            count: missing,
            method: "mode",
        })
    }
}
