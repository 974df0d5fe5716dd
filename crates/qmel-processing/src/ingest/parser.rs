//! Line tokenizer for pipe-decorated dumps.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ParsingMode;

/// Field delimiter and line decoration character.
pub const DELIMITER: char = '|';

// `| |001 |...`: empty selection cell, then a 3-digit client
static SAP_DATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\s*\|\d{3}\s*\|").expect("Invalid regex: SAP data line"));

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The line does not carry the expected `|` decoration.
    DecorationMismatch,
    /// The line split into the wrong number of fields.
    SchemaMismatch,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecorationMismatch => write!(f, "decoration mismatch"),
            Self::SchemaMismatch => write!(f, "field count mismatch"),
        }
    }
}

/// A recoverable rejection of a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedLine {
    /// 0-based line offset in the source.
    pub offset: usize,
    /// Observed number of fields after splitting.
    pub field_count: usize,
    pub reason: RejectReason,
    /// The line as read, without surrounding whitespace.
    pub content: String,
}

/// Result of tokenizing one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank, separator, or (in SAP mode) non-data decoration.
    Skipped,
    Fields(Vec<String>),
    Malformed(MalformedLine),
}

/// Splits raw lines into field vectors according to a [`ParsingMode`].
#[derive(Debug, Clone)]
pub struct LineParser {
    mode: ParsingMode,
    width: usize,
}

impl LineParser {
    /// `width` is the schema column count; it decides whether a leading
    /// empty field is a decoration artifact or real (empty) data.
    pub fn new(mode: ParsingMode, width: usize) -> Self {
        Self { mode, width }
    }

    pub fn parse(&self, raw: &str, offset: usize) -> ParsedLine {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('-') {
            return ParsedLine::Skipped;
        }

        match self.mode {
            ParsingMode::PipeTable => self.parse_pipe_table(line, offset),
            ParsingMode::SapList => Self::parse_sap_list(line),
        }
    }

    fn parse_pipe_table(&self, line: &str, offset: usize) -> ParsedLine {
        let Some(inner) = line.strip_prefix(DELIMITER) else {
            return ParsedLine::Malformed(MalformedLine {
                offset,
                field_count: line.split(DELIMITER).count(),
                reason: RejectReason::DecorationMismatch,
                content: line.to_string(),
            });
        };
        let inner = inner.strip_suffix(DELIMITER).unwrap_or(inner);

        let mut fields: Vec<String> = inner.split(DELIMITER).map(str::to_string).collect();
        if fields.len() == self.width + 1 && fields.first().is_some_and(|f| f.is_empty()) {
            fields.remove(0);
        }

        ParsedLine::Fields(fields)
    }

    fn parse_sap_list(line: &str) -> ParsedLine {
        if !SAP_DATA_LINE.is_match(line) {
            return ParsedLine::Skipped;
        }

        let cells: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        // regex guarantees at least four cells
        let fields = cells[2..cells.len() - 1]
            .iter()
            .map(|s| s.to_string())
            .collect();

        ParsedLine::Fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(parsed: ParsedLine) -> Vec<String> {
        match parsed {
            ParsedLine::Fields(f) => f,
            other => panic!("Expected fields, got {:?}", other),
        }
    }

    #[test]
    fn test_skips_blank_and_separator_lines() {
        let parser = LineParser::new(ParsingMode::PipeTable, 3);
        assert_eq!(parser.parse("", 0), ParsedLine::Skipped);
        assert_eq!(parser.parse("   \t", 1), ParsedLine::Skipped);
        assert_eq!(parser.parse("----------------", 2), ParsedLine::Skipped);
        assert_eq!(parser.parse("  ---|---", 3), ParsedLine::Skipped);
    }

    #[test]
    fn test_pipe_table_strips_one_delimiter_each_side() {
        let parser = LineParser::new(ParsingMode::PipeTable, 3);
        assert_eq!(fields(parser.parse("|a|b|c|", 0)), vec!["a", "b", "c"]);
        // only one instance is removed
        assert_eq!(fields(parser.parse("|a|b||", 0)), vec!["a", "b", ""]);
    }

    #[test]
    fn test_pipe_table_keeps_field_whitespace() {
        let parser = LineParser::new(ParsingMode::PipeTable, 3);
        assert_eq!(
            fields(parser.parse("  | a |b  | c|  ", 0)),
            vec![" a ", "b  ", " c"]
        );
    }

    #[test]
    fn test_pipe_table_drops_leading_artifact() {
        let parser = LineParser::new(ParsingMode::PipeTable, 3);
        assert_eq!(fields(parser.parse("||a|b|c|", 0)), vec!["a", "b", "c"]);
        // a leading empty field that is real data is kept
        assert_eq!(fields(parser.parse("||b|c|", 0)), vec!["", "b", "c"]);
    }

    #[test]
    fn test_pipe_table_rejects_undecorated_line() {
        let parser = LineParser::new(ParsingMode::PipeTable, 3);
        match parser.parse("a|b|c", 7) {
            ParsedLine::Malformed(m) => {
                assert_eq!(m.offset, 7);
                assert_eq!(m.field_count, 3);
                assert_eq!(m.reason, RejectReason::DecorationMismatch);
                assert_eq!(m.content, "a|b|c");
            }
            other => panic!("Expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_sap_list_extracts_data_cells() {
        let parser = LineParser::new(ParsingMode::SapList, 3);
        assert_eq!(
            fields(parser.parse("| |001 | 10000 | M1 |", 0)),
            vec!["001", "10000", "M1"]
        );
    }

    #[test]
    fn test_sap_list_skips_headers_and_titles() {
        let parser = LineParser::new(ParsingMode::SapList, 3);
        assert_eq!(parser.parse("| |MANDT|QMNUM|QMART|", 0), ParsedLine::Skipped);
        assert_eq!(parser.parse("Table: QMEL", 1), ParsedLine::Skipped);
        assert_eq!(parser.parse("|001|10000|M1|", 2), ParsedLine::Skipped);
    }
}
