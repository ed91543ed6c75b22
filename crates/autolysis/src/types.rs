use crate::utils::column_kind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Table
// ============================================================================

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Datetime,
    Text,
}

impl ColumnKind {
    /// Integer and floating columns take part in statistics and correlation.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// An in-memory dataset with named, typed columns of equal length.
///
/// The wrapped [`DataFrame`] is never mutated after construction; stages that
/// need a reshaped view (time-series resampling, model fitting) derive their
/// own copies.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    kinds: Vec<ColumnKind>,
}

impl Table {
    /// Wrap a frame, classifying every column by its dtype.
    pub fn new(frame: DataFrame) -> Self {
        let kinds = frame
            .get_columns()
            .iter()
            .map(|col| column_kind(col.dtype()))
            .collect();
        Self { frame, kinds }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        self.frame.shape()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }

    /// `(name, kind)` pairs in table order.
    pub fn columns(&self) -> Vec<(String, ColumnKind)> {
        self.column_names().into_iter().zip(self.kinds.iter().copied()).collect()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.frame
            .get_column_index(name)
            .map(|idx| self.kinds[idx])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Names of integer and floating columns, in table order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|(_, kind)| kind.is_numeric())
            .map(|(name, _)| name)
            .collect()
    }

    /// Materialized series of a column.
    pub fn series(&self, name: &str) -> PolarsResult<&Series> {
        Ok(self.frame.column(name)?.as_materialized_series())
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Per-column type and completeness information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    /// Storage type as reported by the dataframe engine (e.g. `i64`).
    pub dtype: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub non_null: usize,
}

/// Descriptive statistics of one numeric column, computed over non-null values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Square Pearson correlation matrix over the numeric columns.
///
/// Undefined coefficients (constant columns, fewer than two paired rows) are
/// `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }

    /// Coefficient between two named columns.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.get(i, j)
    }
}

/// Immutable statistical snapshot of a [`Table`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub shape: (usize, usize),
    pub columns: Vec<ColumnSummary>,
    pub summary_stats: Vec<NumericSummary>,
    /// Present only when at least one numeric column exists.
    pub correlation: Option<CorrelationMatrix>,
}

impl Profile {
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn has_numeric_columns(&self) -> bool {
        self.columns.iter().any(|c| c.kind.is_numeric())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn missing_count(&self, name: &str) -> Option<usize> {
        self.column(name).map(|c| c.missing)
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Document,
}

/// A persisted chart or document, addressed by a stable file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// File name, also used to reference the artifact from README.md.
    pub name: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Number of sub-plots drawn (1 for single charts and documents).
    pub panels: usize,
}

impl Artifact {
    pub fn image(name: impl Into<String>, path: PathBuf, panels: usize) -> Self {
        Self {
            name: name.into(),
            path,
            kind: ArtifactKind::Image,
            panels,
        }
    }

    pub fn document(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            kind: ArtifactKind::Document,
            panels: 1,
        }
    }
}

// ============================================================================
// Feature importance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Features ordered by descending importance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceRanking {
    pub entries: Vec<FeatureImportance>,
}

impl FeatureImportanceRanking {
    /// Build a ranking, sorting descending by score (stable for ties).
    pub fn from_scores(features: &[String], scores: &[f64]) -> Self {
        let mut entries: Vec<FeatureImportance> = features
            .iter()
            .zip(scores)
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        entries.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn features(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.feature.as_str()).collect()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.importance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_classifies_columns() {
        let df = df![
            "revenue" => [1.5, 2.5, 3.5],
            "units" => [1i64, 2, 3],
            "region" => ["n", "s", "e"],
            "active" => [true, false, true],
        ]
        .unwrap();

        let table = Table::new(df);
        assert_eq!(table.shape(), (3, 4));
        assert_eq!(table.kind_of("revenue"), Some(ColumnKind::Float));
        assert_eq!(table.kind_of("units"), Some(ColumnKind::Integer));
        assert_eq!(table.kind_of("region"), Some(ColumnKind::Text));
        assert_eq!(table.kind_of("active"), Some(ColumnKind::Boolean));
        assert_eq!(table.kind_of("missing"), None);
        assert_eq!(table.numeric_columns(), vec!["revenue", "units"]);
    }

    #[test]
    fn test_ranking_sorted_descending() {
        let features = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranking = FeatureImportanceRanking::from_scores(&features, &[0.2, 0.5, 0.3]);
        assert_eq!(ranking.features(), vec!["b", "c", "a"]);
        assert!((ranking.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_lookup_by_name() {
        let matrix = CorrelationMatrix {
            columns: vec!["x".to_string(), "y".to_string()],
            values: vec![vec![Some(1.0), Some(-0.5)], vec![Some(-0.5), Some(1.0)]],
        };
        assert_eq!(matrix.between("x", "y"), Some(-0.5));
        assert_eq!(matrix.between("x", "z"), None);
    }

    #[test]
    fn test_numeric_summary_serializes_quartile_keys() {
        let summary = NumericSummary {
            column: "x".to_string(),
            count: 1,
            mean: Some(1.0),
            std: None,
            min: Some(1.0),
            q25: Some(1.0),
            median: Some(1.0),
            q75: Some(1.0),
            max: Some(1.0),
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"25%\""));
        assert!(json.contains("\"std\":null"));
    }
}
