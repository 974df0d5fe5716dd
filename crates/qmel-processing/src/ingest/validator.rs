//! Schema enforcement for parsed field vectors.

use super::parser::{MalformedLine, RejectReason};
use crate::schema::Schema;

/// Verdict on a parsed field vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    Accepted(Vec<String>),
    /// The schema's own column header, repeated in the dump.
    Header,
    Rejected(MalformedLine),
}

/// Accepts field vectors whose length matches the schema exactly.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
}

impl SchemaValidator {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validate(&self, fields: Vec<String>, offset: usize, raw: &str) -> Validated {
        if fields.len() != self.schema.len() {
            return Validated::Rejected(MalformedLine {
                offset,
                field_count: fields.len(),
                reason: RejectReason::SchemaMismatch,
                content: raw.trim().to_string(),
            });
        }

        if self.schema.is_header(&fields) {
            return Validated::Header;
        }

        Validated::Accepted(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::QMEL_COLUMNS;

    #[test]
    fn test_accepts_exact_width() {
        let validator = SchemaValidator::new(Schema::qmel());
        let fields: Vec<String> = (0..20).map(|i| format!("v{}", i)).collect();
        assert_eq!(
            validator.validate(fields.clone(), 0, "raw"),
            Validated::Accepted(fields)
        );
    }

    #[test]
    fn test_rejects_short_vector() {
        let validator = SchemaValidator::new(Schema::qmel());
        let fields: Vec<String> = (0..18).map(|i| format!("v{}", i)).collect();
        match validator.validate(fields, 4, "  |short|line|  ") {
            Validated::Rejected(m) => {
                assert_eq!(m.offset, 4);
                assert_eq!(m.field_count, 18);
                assert_eq!(m.reason, RejectReason::SchemaMismatch);
                assert_eq!(m.content, "|short|line|");
            }
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_recognises_header() {
        let validator = SchemaValidator::new(Schema::qmel());
        let header: Vec<String> = QMEL_COLUMNS.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(validator.validate(header, 0, ""), Validated::Header);
    }
}
