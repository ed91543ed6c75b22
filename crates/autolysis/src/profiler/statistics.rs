//! Descriptive statistics for numeric columns.

use crate::types::NumericSummary;
use crate::utils::{mean, non_null_f64, quantile_sorted, sample_std, sorted_copy};
use polars::prelude::*;

/// Summarize a numeric series the way `describe()` does: count of non-null
/// values, mean, sample standard deviation, min, quartiles and max.
pub(crate) fn describe_numeric(series: &Series) -> PolarsResult<NumericSummary> {
    let values = non_null_f64(series)?;
    Ok(describe_values(series.name().as_str(), &values))
}

pub(crate) fn describe_values(column: &str, values: &[f64]) -> NumericSummary {
    let sorted = sorted_copy(values);

    NumericSummary {
        column: column.to_string(),
        count: values.len(),
        mean: mean(values),
        std: sample_std(values),
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}
