//! Shared helpers for value parsing and series manipulation.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Value Formats
// =============================================================================

/// Date layout of the raw export.
pub const SOURCE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Time layout of the raw export and of the cleaned output.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Date layout of the cleaned output.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

// days from 0001-01-01 (CE day 1) to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Currency and percent marks stripped before parsing.
///
/// Separators are not in this list: `10,5` and `1.234,56` are ambiguous and
/// must fail to parse rather than change value.
pub const NUMERIC_FORMAT_CHARS: [char; 4] = ['$', '%', '€', '£'];

/// Remove currency and percent marks from a numeric string.
///
/// # Example
///
/// ```rust,ignore
/// use qmel_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string(" $1234.56 "), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result.trim().to_string()
}

/// Parse a numeric cell as f64.
///
/// Accepts SAP's trailing minus sign (`12.50-`). Non-finite results are
/// rejected.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }

    let value = match cleaned.strip_suffix('-') {
        Some(body) if !body.is_empty() && !body.starts_with('-') => {
            body.parse::<f64>().ok().map(|v| -v)
        }
        _ => cleaned.parse::<f64>().ok(),
    };
    value.filter(|v| v.is_finite())
}

/// Parse a `dd.mm.yyyy` cell. SAP's empty date `00.00.0000` yields `None`.
pub fn parse_source_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), SOURCE_DATE_FORMAT).ok()
}

/// Parse a `hh:mm:ss` cell.
pub fn parse_source_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).ok()
}

// =============================================================================
// Temporal Representation
// =============================================================================

/// Days since 1970-01-01, the physical value of a polars `Date`.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Nanoseconds since midnight, the physical value of a polars `Time`.
pub fn time_to_nanos(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND + time.nanosecond() as i64
}

pub fn nanos_to_time(nanos: i64) -> Option<NaiveTime> {
    if nanos < 0 {
        return None;
    }
    let secs = u32::try_from(nanos / NANOS_PER_SECOND).ok()?;
    let rem = u32::try_from(nanos % NANOS_PER_SECOND).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, rem)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent value; ties go to the value seen first.
pub fn first_seen_mode<T, I>(values: I) -> Option<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts
            .entry(value)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

/// Mode of a string Series, ignoring nulls.
pub fn string_mode(series: &Series) -> Option<String> {
    let values = series.str().ok()?;
    first_seen_mode(values.into_iter().flatten().map(str::to_string))
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a Float64 Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values = series.f64()?;
    let filled: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a String Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let values = series.str()?;
    let filled: Vec<Option<String>> = values
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}
