//! Feature importance estimation.
//!
//! When the table carries a label column (literally named `target` unless
//! configured otherwise), a random forest is fitted with every numeric column
//! as a feature and the features are ranked by their share of the forest's
//! variance reduction. A numeric label is itself one of the features. This is
//! an exploratory signal: there is no train/test split and no cross-validation.

mod forest;

pub use forest::{FittedForest, ForestError, RandomForestRegressor, RegressionTree};

use crate::config::ReportConfig;
use crate::error::Result;
use crate::types::{Artifact, FeatureImportanceRanking, Profile, Table};
use crate::utils::series_to_f64;
use crate::visuals::VisualizationSelector;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rows kept for fitting after null handling.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<String>,
    /// Column-major feature values, `columns[f][row]`.
    pub columns: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    pub dropped_rows: usize,
}

/// Ranks numeric features against the target column.
#[derive(Debug, Clone)]
pub struct FeatureImportanceEstimator {
    target_column: String,
    forest: RandomForestRegressor,
}

impl FeatureImportanceEstimator {
    pub fn new(target_column: impl Into<String>, forest: RandomForestRegressor) -> Self {
        Self {
            target_column: target_column.into(),
            forest,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.target_column.clone(),
            RandomForestRegressor::new(config.n_estimators, config.random_seed),
        )
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Numeric columns used as features, the target included.
    pub fn feature_columns(&self, profile: &Profile) -> Vec<String> {
        profile
            .numeric_columns()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Gather complete rows for fitting.
    ///
    /// A row is kept only when the target and every feature are present, so
    /// feature matrix and label vector always stay aligned.
    pub fn training_set(&self, table: &Table, profile: &Profile) -> Result<TrainingSet> {
        let features = self.feature_columns(profile);
        let target = series_to_f64(table.series(&self.target_column)?)?;

        let mut raw = Vec::with_capacity(features.len());
        for name in &features {
            raw.push(series_to_f64(table.series(name)?)?);
        }

        let present = |v: &Option<f64>| matches!(v, Some(x) if !x.is_nan());
        let keep: Vec<usize> = (0..table.height())
            .filter(|&row| present(&target[row]) && raw.iter().all(|col| present(&col[row])))
            .collect();

        let columns = raw
            .iter()
            .map(|col| keep.iter().filter_map(|&row| col[row]).collect())
            .collect();
        let labels = keep.iter().filter_map(|&row| target[row]).collect();

        Ok(TrainingSet {
            features,
            columns,
            labels,
            dropped_rows: table.height() - keep.len(),
        })
    }

    /// Estimate the ranking, or `None` when the preconditions do not hold.
    ///
    /// Preconditions: at least one numeric column, a numeric column named
    /// like the target, and at least two complete rows.
    pub fn estimate(
        &self,
        table: &Table,
        profile: &Profile,
    ) -> Result<Option<FeatureImportanceRanking>> {
        if !profile.has_numeric_columns() {
            debug!("No numeric columns, skipping feature importance");
            return Ok(None);
        }
        if !table.has_column(&self.target_column) {
            debug!(
                "No '{}' column, skipping feature importance",
                self.target_column
            );
            return Ok(None);
        }
        if let Some(kind) = table.kind_of(&self.target_column).filter(|k| !k.is_numeric()) {
            warn!(
                "Column '{}' is {}, not numeric; skipping feature importance",
                self.target_column, kind
            );
            return Ok(None);
        }

        let set = self.training_set(table, profile)?;
        if set.labels.len() < 2 {
            warn!(
                "Only {} complete rows with a numeric '{}', skipping feature importance",
                set.labels.len(),
                self.target_column
            );
            return Ok(None);
        }
        if set.dropped_rows > 0 {
            info!(
                "Dropped {} rows with missing feature or target values",
                set.dropped_rows
            );
        }

        info!(
            "Fitting random forest ({} trees) on {} rows x {} features",
            self.forest.n_estimators,
            set.labels.len(),
            set.features.len()
        );
        let fitted = self.forest.fit(&set.columns, &set.labels)?;

        let ranking =
            FeatureImportanceRanking::from_scores(&set.features, &fitted.feature_importances);
        for entry in &ranking.entries {
            debug!("  {:<24} {:.4}", entry.feature, entry.importance);
        }
        Ok(Some(ranking))
    }

    /// Estimate the ranking and draw `feature_importance.png` into `out_dir`.
    ///
    /// A chart that fails to render is logged; the ranking is still returned.
    pub fn estimate_and_render(
        &self,
        table: &Table,
        profile: &Profile,
        out_dir: &Path,
    ) -> Result<Option<(FeatureImportanceRanking, Option<Artifact>)>> {
        let Some(ranking) = self.estimate(table, profile)? else {
            return Ok(None);
        };
        if ranking.is_empty() {
            return Ok(Some((ranking, None)));
        }

        let artifact = match VisualizationSelector::new(out_dir).render_feature_importance(&ranking) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!("Failed to render feature importance: {}", e);
                None
            }
        };
        Ok(Some((ranking, artifact)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::StatisticalProfiler;
    use polars::prelude::*;

    fn estimator() -> FeatureImportanceEstimator {
        FeatureImportanceEstimator::new("target", RandomForestRegressor::new(10, 42))
    }

    fn run(df: DataFrame) -> Option<FeatureImportanceRanking> {
        let table = Table::new(df);
        let profile = StatisticalProfiler::profile(&table).unwrap();
        estimator().estimate(&table, &profile).unwrap()
    }

    #[test]
    fn test_no_target_column_yields_no_ranking() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [4.0, 3.0, 2.0, 1.0],
        ]
        .unwrap();
        assert!(run(df).is_none());
    }

    #[test]
    fn test_no_numeric_columns_yields_no_ranking() {
        let df = df![
            "name" => ["a", "b", "c"],
            "target" => ["x", "y", "z"],
        ]
        .unwrap();
        assert!(run(df).is_none());
    }

    #[test]
    fn test_ranking_contains_exactly_numeric_features() {
        let x1: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let x2: Vec<f64> = (0..50).map(|i| ((i * 13) % 7) as f64).collect();
        let target: Vec<f64> = x1.iter().map(|v| v * 2.0).collect();
        let labels: Vec<&str> = (0..50).map(|i| if i % 2 == 0 { "even" } else { "odd" }).collect();

        let df = df![
            "x1" => x1,
            "x2" => x2,
            "label" => labels,
            "target" => target,
        ]
        .unwrap();

        let ranking = run(df).unwrap();
        let mut features = ranking.features();
        features.sort();
        assert_eq!(features, vec!["target", "x1", "x2"]);
        assert!(ranking.entries.iter().all(|e| e.importance >= 0.0));
        assert!((ranking.total() - 1.0).abs() < 1e-9);
        assert_ne!(ranking.entries[0].feature, "x2");
    }

    #[test]
    fn test_only_target_numeric_ranks_target() {
        let df = df![
            "name" => ["a", "b", "c"],
            "target" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let ranking = run(df).unwrap();
        assert_eq!(ranking.features(), vec!["target"]);
        assert!((ranking.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_target_yields_no_ranking() {
        let df = df![
            "x" => [1.0, 2.0, 3.0],
            "target" => ["low", "mid", "high"],
        ]
        .unwrap();
        assert!(run(df).is_none());
    }

    #[test]
    fn test_training_set_drops_rows_jointly() {
        let df = df![
            "x" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "target" => [Some(10.0), Some(20.0), None, Some(40.0)],
        ]
        .unwrap();
        let table = Table::new(df);
        let profile = StatisticalProfiler::profile(&table).unwrap();

        let set = estimator().training_set(&table, &profile).unwrap();
        assert_eq!(set.features, vec!["x", "target"]);
        assert_eq!(set.columns, vec![vec![1.0, 4.0], vec![10.0, 40.0]]);
        assert_eq!(set.labels, vec![10.0, 40.0]);
        assert_eq!(set.dropped_rows, 2);
    }

    #[test]
    fn test_custom_target_column_name() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "price" => [2.0, 4.0, 6.0, 8.0, 10.0],
        ]
        .unwrap();
        let table = Table::new(df);
        let profile = StatisticalProfiler::profile(&table).unwrap();

        let estimator = FeatureImportanceEstimator::new("price", RandomForestRegressor::new(5, 1));
        let ranking = estimator.estimate(&table, &profile).unwrap().unwrap();
        let mut features = ranking.features();
        features.sort();
        assert_eq!(features, vec!["price", "x"]);
    }

    #[test]
    fn test_estimate_and_render_writes_chart() {
        let dir = tempfile::tempdir().unwrap();
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "z" => [6.0, 1.0, 5.0, 2.0, 4.0, 3.0],
            "target" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        ]
        .unwrap();
        let table = Table::new(df);
        let profile = StatisticalProfiler::profile(&table).unwrap();

        let (ranking, artifact) = estimator()
            .estimate_and_render(&table, &profile, dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(ranking.len(), 3);
        let artifact = artifact.unwrap();
        assert_eq!(artifact.name, "feature_importance.png");
        assert!(dir.path().join("feature_importance.png").exists());
    }
}
