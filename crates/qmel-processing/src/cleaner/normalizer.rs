//! Case normalization of categorical columns.

use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::table::Table;

/// Upper-cases every value of the Identifier, Text and Currency columns.
/// Nulls stay null. Applying it twice changes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, table: &mut Table) -> Result<()> {
        info!("Normalizing categorical columns...");

        let categorical: Vec<String> = table
            .schema()
            .columns()
            .iter()
            .filter(|c| c.semantic_type.is_categorical())
            .map(|c| c.name.clone())
            .collect();

        for name in categorical {
            let upper = Self::uppercase_series(table.column(&name)?)?;
            table.replace_column(&name, upper)?;
        }
        Ok(())
    }

    pub fn uppercase_series(series: &Series) -> Result<Series> {
        let values = series.str()?;
        let upper: Vec<Option<String>> = values
            .into_iter()
            .map(|v| v.map(str::to_uppercase))
            .collect();
        Ok(Series::new(series.name().clone(), upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, Schema, SemanticType};

    fn table() -> Table {
        let schema = Schema::new(vec![
            ColumnDef::new("QMART", SemanticType::Text),
            ColumnDef::new("ARTPR", SemanticType::Numeric),
            ColumnDef::new("WAERS", SemanticType::Currency),
        ]);
        let rows = vec![
            vec!["m1".to_string(), "abc".to_string(), "usd".to_string()],
            vec!["Ärger".to_string(), "x".to_string(), "Eur".to_string()],
        ];
        Table::from_rows(schema, &rows).unwrap()
    }

    #[test]
    fn test_uppercases_categorical_only() {
        let mut table = table();
        Normalizer::new().normalize(&mut table).unwrap();

        assert_eq!(table.cell_str("QMART", 0).unwrap(), Some("M1".to_string()));
        assert_eq!(table.cell_str("QMART", 1).unwrap(), Some("ÄRGER".to_string()));
        assert_eq!(table.cell_str("WAERS", 1).unwrap(), Some("EUR".to_string()));
        // numeric column is not categorical and keeps its case
        assert_eq!(table.cell_str("ARTPR", 0).unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = table();
        Normalizer::new().normalize(&mut once).unwrap();
        let mut twice = once.clone();
        Normalizer::new().normalize(&mut twice).unwrap();

        assert!(once.data_frame().equals_missing(twice.data_frame()));
    }

    #[test]
    fn test_nulls_stay_null() {
        let series = Series::new("QMTXT".into(), &[Some("a"), None]);
        let upper = Normalizer::uppercase_series(&series).unwrap();
        assert_eq!(upper.null_count(), 1);
        assert_eq!(upper.str().unwrap().get(0), Some("A"));
    }
}
