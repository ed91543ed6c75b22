//! Recognition and coercion of date/time columns.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Column names treated as date/time fields - compiled once at startup
static DATE_COLUMN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(date|datetime|timestamp|time|.+[_ ]date|date[_ ].+|.+[_ ]time)$")
        .expect("Invalid regex: date column name")
});

/// Formats carrying a time of day, tried before the date-only ones.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

/// Whether a column name looks like a date/time field.
pub fn is_date_column_name(name: &str) -> bool {
    DATE_COLUMN_NAME.is_match(name.trim())
}

fn parse_with(value: &str, format: &str, with_time: bool) -> Option<i64> {
    let value = value.trim();
    if with_time {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|dt| dt.and_utc().timestamp_millis())
    } else {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    }
}

/// Convert a text series into `Datetime(ms)`.
///
/// One format must parse every non-null value; mixed or unparseable columns
/// return `None` and stay as text.
pub fn coerce_to_datetime(series: &Series) -> Option<Series> {
    let strings = series.str().ok()?;
    let values: Vec<Option<&str>> = strings.into_iter().collect();

    if values.iter().all(|v| v.is_none()) {
        return None;
    }

    let candidates = DATETIME_FORMATS
        .iter()
        .map(|f| (*f, true))
        .chain(DATE_FORMATS.iter().map(|f| (*f, false)));

    for (format, with_time) in candidates {
        let parsed: Option<Vec<Option<i64>>> = values
            .iter()
            .map(|v| match v {
                Some(s) if s.trim().is_empty() => Some(None),
                Some(s) => parse_with(s, format, with_time).map(Some),
                None => Some(None),
            })
            .collect();

        if let Some(millis) = parsed {
            return Series::new(series.name().clone(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .ok();
        }
    }

    None
}

/// Epoch milliseconds of a date or datetime series, nulls preserved.
pub fn datetime_millis(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let as_ms = series
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(as_ms.i64()?.into_iter().collect())
}
