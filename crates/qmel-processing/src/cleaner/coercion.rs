//! String to typed column conversion.
//!
//! Conversion never fails a run: a cell that does not parse becomes null and,
//! if it held text, is counted as a coercion failure.

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{Result, ResultExt};
use crate::report::DiagnosticReport;
use crate::schema::SemanticType;
use crate::table::Table;
use crate::utils::{
    date_to_days, parse_numeric_string, parse_source_date, parse_source_time, time_to_nanos,
};

/// Converted column plus the number of non-empty cells that failed to parse.
#[derive(Debug)]
pub struct Coerced {
    pub series: Series,
    pub failures: usize,
}

/// Converts the raw string columns of a [`Table`] to their semantic types.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeCoercer;

impl TypeCoercer {
    pub fn new() -> Self {
        Self
    }

    /// Coerce every Numeric, Date and Time column in place. Identifier,
    /// Text and Currency columns stay strings.
    pub fn coerce(&self, table: &mut Table, report: &mut DiagnosticReport) -> Result<()> {
        info!("Coercing column types...");

        let targets: Vec<(String, SemanticType)> = table
            .schema()
            .columns()
            .iter()
            .filter(|c| !c.semantic_type.is_categorical())
            .map(|c| (c.name.clone(), c.semantic_type))
            .collect();

        for (name, ty) in targets {
            let series = table.column(&name)?;
            if series.dtype() != &DataType::String {
                debug!("Column '{}' already typed as {}, skipping", name, series.dtype());
                continue;
            }

            let coerced = Self::coerce_series(series, ty)
                .context(format!("Coercing column '{}' to {}", name, ty.display_name()))?;
            if coerced.failures > 0 {
                debug!(
                    "Column '{}': {} values could not be parsed as {}",
                    name,
                    coerced.failures,
                    ty.display_name()
                );
            }
            report.record_coercion_failures(&name, coerced.failures);
            table.replace_column(&name, coerced.series)?;
        }

        let total = report.total_coercion_failures();
        if total > 0 {
            info!("{} unparseable values set to null", total);
        }
        Ok(())
    }

    /// Convert one string series to the physical layout of `ty`.
    pub fn coerce_series(series: &Series, ty: SemanticType) -> Result<Coerced> {
        let name = series.name().clone();
        let values = series.str()?;

        match ty {
            SemanticType::Numeric => {
                let (parsed, failures) = Self::parse_each(values, parse_numeric_string);
                Ok(Coerced {
                    series: Series::new(name, parsed),
                    failures,
                })
            }
            SemanticType::Date => {
                let (parsed, failures) =
                    Self::parse_each(values, |s| parse_source_date(s).map(date_to_days));
                let series = Series::new(name, parsed).cast(&DataType::Date)?;
                Ok(Coerced { series, failures })
            }
            SemanticType::Time => {
                let (parsed, failures) =
                    Self::parse_each(values, |s| parse_source_time(s).map(time_to_nanos));
                let series = Series::new(name, parsed).cast(&DataType::Time)?;
                Ok(Coerced { series, failures })
            }
            SemanticType::Identifier | SemanticType::Text | SemanticType::Currency => {
                Ok(Coerced {
                    series: series.clone(),
                    failures: 0,
                })
            }
        }
    }

    fn parse_each<T>(
        values: &StringChunked,
        parse: impl Fn(&str) -> Option<T>,
    ) -> (Vec<Option<T>>, usize) {
        let mut failures = 0;
        let parsed = values
            .into_iter()
            .map(|opt| {
                let raw = opt?;
                if raw.trim().is_empty() {
                    return None;
                }
                let value = parse(raw);
                if value.is_none() {
                    failures += 1;
                }
                value
            })
            .collect();
        (parsed, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, Schema};
    use chrono::NaiveDate;

    fn string_series(name: &str, values: &[&str]) -> Series {
        Series::new(name.into(), values)
    }

    // ========================================================================
    // coerce_series() tests
    // ========================================================================

    #[test]
    fn test_numeric_coercion() {
        let series = string_series("ARTPR", &["10.5", " 1 ", "", "abc", "10,5", "1.234,56"]);
        let coerced = TypeCoercer::coerce_series(&series, SemanticType::Numeric).unwrap();
        let values = coerced.series.f64().unwrap();

        assert_eq!(values.get(0), Some(10.5));
        assert_eq!(values.get(1), Some(1.0));
        assert_eq!(values.get(2), None);
        assert_eq!(values.get(3), None);
        assert_eq!(values.get(4), None);
        assert_eq!(values.get(5), None);
        // empty cell is missing, not a failure
        assert_eq!(coerced.failures, 3);
    }

    #[test]
    fn test_date_coercion() {
        let series = string_series("ERDAT", &["01.01.2023", "00.00.0000", "", "2023-01-01"]);
        let coerced = TypeCoercer::coerce_series(&series, SemanticType::Date).unwrap();

        assert_eq!(coerced.series.dtype(), &DataType::Date);
        assert_eq!(coerced.series.null_count(), 3);
        assert_eq!(coerced.failures, 2);

        let physical = coerced.series.to_physical_repr();
        let days = physical.i32().unwrap();
        let expected = date_to_days(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(days.get(0), Some(expected));
    }

    #[test]
    fn test_time_coercion() {
        let series = string_series("MZEIT", &["10:00:00", "99:00:00"]);
        let coerced = TypeCoercer::coerce_series(&series, SemanticType::Time).unwrap();

        assert_eq!(coerced.series.dtype(), &DataType::Time);
        assert_eq!(coerced.failures, 1);
        let physical = coerced.series.to_physical_repr();
        assert_eq!(physical.i64().unwrap().get(0), Some(36_000_000_000_000));
    }

    #[test]
    fn test_categorical_columns_untouched() {
        let series = string_series("QMTXT", &["", " Pump "]);
        let coerced = TypeCoercer::coerce_series(&series, SemanticType::Text).unwrap();
        assert!(coerced.series.equals(&series));
        assert_eq!(coerced.failures, 0);
    }

    // ========================================================================
    // coerce() tests
    // ========================================================================

    #[test]
    fn test_coerce_table_records_failures() {
        let schema = Schema::new(vec![
            ColumnDef::new("QMNUM", SemanticType::Identifier),
            ColumnDef::new("ARTPR", SemanticType::Numeric),
            ColumnDef::new("ERDAT", SemanticType::Date),
        ]);
        let rows = vec![
            vec!["1".to_string(), "x".to_string(), "01.01.2023".to_string()],
            vec!["2".to_string(), "3".to_string(), "bad".to_string()],
        ];
        let mut table = Table::from_rows(schema, &rows).unwrap();
        let mut report = DiagnosticReport::new();

        TypeCoercer::new().coerce(&mut table, &mut report).unwrap();

        assert_eq!(table.column("QMNUM").unwrap().dtype(), &DataType::String);
        assert_eq!(table.column("ARTPR").unwrap().dtype(), &DataType::Float64);
        assert_eq!(table.column("ERDAT").unwrap().dtype(), &DataType::Date);
        assert_eq!(report.coercion_failures.get("ARTPR"), Some(&1));
        assert_eq!(report.coercion_failures.get("ERDAT"), Some(&1));
        assert_eq!(report.total_coercion_failures(), 2);
    }
}
