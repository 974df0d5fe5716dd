//! The fixed QMEL notification schema.
//!
//! Column types are decided here once, not inferred from data: every later
//! stage dispatches on [`SemanticType`].

use serde::{Deserialize, Serialize};

/// Semantic type of a notification column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Keys and reference numbers (client, notification, order, version).
    Identifier,
    /// Free text and user names.
    Text,
    /// Floating point values.
    Numeric,
    /// `dd.mm.yyyy` dates.
    Date,
    /// `hh:mm:ss` times of day.
    Time,
    /// ISO currency code.
    Currency,
}

impl SemanticType {
    /// Categorical columns are imputed with the mode and upper-cased.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Identifier | Self::Text | Self::Currency)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Time => "time",
            Self::Currency => "currency",
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub semantic_type: SemanticType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }
}

/// Column layout of the QMEL export, in file order.
pub const QMEL_COLUMNS: [(&str, SemanticType); 20] = [
    ("MANDT", SemanticType::Identifier),
    ("QMNUM", SemanticType::Identifier),
    ("QMART", SemanticType::Text),
    ("QMTXT", SemanticType::Text),
    ("ARTPR", SemanticType::Numeric),
    ("PRIOK", SemanticType::Numeric),
    ("ERNAM", SemanticType::Text),
    ("ERDAT", SemanticType::Date),
    ("AENAM", SemanticType::Text),
    ("AEDAT", SemanticType::Date),
    ("MZEIT", SemanticType::Time),
    ("QMDAT", SemanticType::Date),
    ("QMNAM", SemanticType::Text),
    ("STRMN", SemanticType::Date),
    ("STRUR", SemanticType::Time),
    ("LTRMN", SemanticType::Date),
    ("LTRUR", SemanticType::Time),
    ("WAERS", SemanticType::Currency),
    ("AUFNR", SemanticType::Identifier),
    ("VERID", SemanticType::Identifier),
];

/// Primary key of a notification record.
pub const PRIMARY_KEY: &str = "QMNUM";

/// Ordered list of column descriptors.
///
/// A `Schema` only ever shrinks: quality filtering may remove columns, but
/// the relative order of the survivors never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// The 20-column notification schema.
    pub fn qmel() -> Self {
        Self::new(
            QMEL_COLUMNS
                .iter()
                .map(|(name, ty)| ColumnDef::new(*name, *ty))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of all columns of the given semantic type, in schema order.
    pub fn columns_of(&self, ty: SemanticType) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type == ty)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Remove the named columns, keeping the order of the rest.
    pub fn remove(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(&c.name));
    }

    /// True when `fields` is the schema's own header line.
    pub fn is_header(&self, fields: &[String]) -> bool {
        fields.len() == self.columns.len()
            && fields
                .iter()
                .zip(&self.columns)
                .all(|(field, col)| field.trim().eq_ignore_ascii_case(&col.name))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::qmel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qmel_schema_order() {
        let schema = Schema::qmel();
        assert_eq!(schema.len(), 20);
        let names = schema.names();
        assert_eq!(names[0], "MANDT");
        assert_eq!(names[1], PRIMARY_KEY);
        assert_eq!(names[19], "VERID");
    }

    #[test]
    fn test_columns_of_type() {
        let schema = Schema::qmel();
        assert_eq!(
            schema.columns_of(SemanticType::Date),
            vec!["ERDAT", "AEDAT", "QMDAT", "STRMN", "LTRMN"]
        );
        assert_eq!(
            schema.columns_of(SemanticType::Time),
            vec!["MZEIT", "STRUR", "LTRUR"]
        );
        assert_eq!(schema.columns_of(SemanticType::Numeric), vec!["ARTPR", "PRIOK"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut schema = Schema::qmel();
        schema.remove(&["QMTXT".to_string(), "ARTPR".to_string()]);
        assert_eq!(schema.len(), 18);
        let names = schema.names();
        assert_eq!(&names[..4], &["MANDT", "QMNUM", "QMART", "PRIOK"]);
    }

    #[test]
    fn test_is_header() {
        let schema = Schema::qmel();
        let header: Vec<String> = QMEL_COLUMNS.iter().map(|(n, _)| format!(" {} ", n)).collect();
        assert!(schema.is_header(&header));

        let mut data = header.clone();
        data[1] = "000010000123".to_string();
        assert!(!schema.is_header(&data));
    }

    #[test]
    fn test_categorical_types() {
        assert!(SemanticType::Identifier.is_categorical());
        assert!(SemanticType::Currency.is_categorical());
        assert!(!SemanticType::Numeric.is_categorical());
        assert!(!SemanticType::Date.is_categorical());
    }
}
