//! Statistical profiling of a loaded table.
//!
//! This module provides functionality for profiling datasets, including:
//! - Per-column type classification and missing-value counts
//! - Descriptive statistics for numeric columns
//! - Pairwise Pearson correlation across numeric columns
//!
//! Profiling is a pure function of the table: no I/O, no randomness.

mod correlation;
mod statistics;

use crate::error::{Result, ResultExt};
use crate::types::{ColumnSummary, Profile, Table};
use crate::utils::series_to_f64;
use tracing::debug;

use correlation::correlation_matrix;
use statistics::describe_numeric;

/// Computes the [`Profile`] of a [`Table`].
pub struct StatisticalProfiler;

impl StatisticalProfiler {
    /// Profile an entire table.
    ///
    /// The correlation matrix is `None` when the table has no numeric
    /// columns, never an empty matrix.
    pub fn profile(table: &Table) -> Result<Profile> {
        let mut columns = Vec::with_capacity(table.shape().1);
        for (name, kind) in table.columns() {
            let series = table.series(&name)?;
            let missing = series.null_count();
            columns.push(ColumnSummary {
                dtype: series.dtype().to_string(),
                kind,
                missing,
                non_null: series.len() - missing,
                name,
            });
        }

        let numeric = table.numeric_columns();
        let mut summary_stats = Vec::with_capacity(numeric.len());
        let mut numeric_values = Vec::with_capacity(numeric.len());
        for name in &numeric {
            let series = table.series(name)?;
            summary_stats.push(
                describe_numeric(series).context(format!("Describing column '{}'", name))?,
            );
            numeric_values.push(series_to_f64(series)?);
        }

        let correlation = if numeric.is_empty() {
            None
        } else {
            Some(correlation_matrix(numeric.clone(), &numeric_values))
        };

        debug!(
            "Profiled {} columns ({} numeric, {} missing values)",
            columns.len(),
            numeric.len(),
            columns.iter().map(|c| c.missing).sum::<usize>()
        );

        Ok(Profile {
            shape: table.shape(),
            columns,
            summary_stats,
            correlation,
        })
    }
}
