//! Monthly aggregation for the time-series chart.
//!
//! The table itself is never reindexed: rows are bucketed by calendar month
//! of the date column and every numeric column is averaged per bucket.

use crate::loader::{datetime_millis, is_date_column_name};
use crate::types::{ColumnKind, Table};
use crate::utils::series_to_f64;
use chrono::{DateTime, Datelike};
use polars::prelude::PolarsResult;
use std::collections::BTreeMap;

/// Per-month means, one slot per calendar month between the first and last
/// observed dates. Months without observations are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    pub date_column: String,
    pub months: Vec<(i32, u32)>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
}

impl MonthlySeries {
    pub fn month_labels(&self) -> Vec<String> {
        self.months
            .iter()
            .map(|(y, m)| format!("{:04}-{:02}", y, m))
            .collect()
    }
}

/// First column that both looks like a date by name and holds temporal values.
pub fn find_date_column(table: &Table) -> Option<String> {
    table
        .columns()
        .into_iter()
        .find(|(name, kind)| *kind == ColumnKind::Datetime && is_date_column_name(name))
        .map(|(name, _)| name)
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// Average every numeric column by month of `date_column`.
///
/// Returns `None` when there is no numeric column or no valid date.
pub fn resample_monthly(table: &Table, date_column: &str) -> PolarsResult<Option<MonthlySeries>> {
    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        return Ok(None);
    }

    let months: Vec<Option<(i32, u32)>> = datetime_millis(table.series(date_column)?)?
        .into_iter()
        .map(|ms| {
            ms.and_then(DateTime::from_timestamp_millis)
                .map(|dt| (dt.year(), dt.month()))
        })
        .collect();

    let (Some(first), Some(last)) = (
        months.iter().flatten().min().copied(),
        months.iter().flatten().max().copied(),
    ) else {
        return Ok(None);
    };

    let mut calendar = vec![first];
    while let Some(&current) = calendar.last() {
        if current >= last {
            break;
        }
        calendar.push(next_month(current));
    }

    let mut columns = Vec::with_capacity(numeric.len());
    for name in numeric {
        let values = series_to_f64(table.series(&name)?)?;
        let mut buckets: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
        for (month, value) in months.iter().zip(values) {
            if let (Some(month), Some(v)) = (month, value.filter(|v| !v.is_nan())) {
                let slot = buckets.entry(*month).or_insert((0.0, 0));
                slot.0 += v;
                slot.1 += 1;
            }
        }
        let means = calendar
            .iter()
            .map(|m| buckets.get(m).map(|(sum, n)| sum / *n as f64))
            .collect();
        columns.push((name, means));
    }

    Ok(Some(MonthlySeries {
        date_column: date_column.to_string(),
        months: calendar,
        columns,
    }))
}
