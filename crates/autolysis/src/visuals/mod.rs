//! Chart selection and rendering.
//!
//! The selector decides which charts a table supports and renders each one
//! to a PNG under the output directory. Each rule is independent: a failed
//! render is logged and skipped, and the remaining charts are still drawn.
//!
//! | Chart | Rule |
//! |-------|------|
//! | `numeric_histograms.png` | at least one numeric column |
//! | `numeric_boxplots.png` | at least one numeric column |
//! | `correlation_matrix.png` | a correlation matrix exists |
//! | `missing_values.png` | always |
//! | `time_series_analysis.png` | a date-named temporal column and numeric data |
//! | `feature_importance.png` | a feature importance ranking exists |

mod charts;
mod time_series;

pub use time_series::{find_date_column, resample_monthly, MonthlySeries};

use crate::error::{AnalysisError, Result};
use crate::types::{Artifact, CorrelationMatrix, FeatureImportanceRanking, Profile, Table};
use crate::utils::non_null_f64;
use charts::{draw_bars, draw_boxplot, draw_heatmap, draw_histogram, draw_lines, grid_shape, render_png};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const NUMERIC_HISTOGRAMS: &str = "numeric_histograms.png";
pub const NUMERIC_BOXPLOTS: &str = "numeric_boxplots.png";
pub const CORRELATION_MATRIX: &str = "correlation_matrix.png";
pub const MISSING_VALUES: &str = "missing_values.png";
pub const TIME_SERIES: &str = "time_series_analysis.png";
pub const FEATURE_IMPORTANCE: &str = "feature_importance.png";

const PANEL_WIDTH: u32 = 500;
const PANEL_HEIGHT: u32 = 400;

/// Renders the chart set for a profiled table.
#[derive(Debug, Clone)]
pub struct VisualizationSelector {
    out_dir: PathBuf,
}

impl VisualizationSelector {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Render every applicable chart and return the ones that were written.
    ///
    /// Feature importance is drawn separately through
    /// [`render_feature_importance`](Self::render_feature_importance) once a
    /// ranking is available.
    pub fn render(&self, table: &Table, profile: &Profile) -> Vec<Artifact> {
        if let Err(e) = std::fs::create_dir_all(&self.out_dir) {
            warn!(
                "Cannot create output directory {}: {}",
                self.out_dir.display(),
                e
            );
            return Vec::new();
        }

        let attempts = [
            (NUMERIC_HISTOGRAMS, self.render_histograms(table, profile)),
            (NUMERIC_BOXPLOTS, self.render_boxplots(table, profile)),
            (CORRELATION_MATRIX, self.render_correlation(profile)),
            (MISSING_VALUES, self.render_missing_values(profile).map(Some)),
            (TIME_SERIES, self.render_time_series(table)),
        ];

        let mut artifacts = Vec::new();
        for (name, outcome) in attempts {
            match outcome {
                Ok(Some(artifact)) => {
                    info!("Saved {}", artifact.path.display());
                    artifacts.push(artifact);
                }
                Ok(None) => debug!("Skipped {}: not applicable", name),
                Err(e) => warn!("Failed to render {}: {}", name, e),
            }
        }
        artifacts
    }

    fn target(&self, name: &str) -> PathBuf {
        self.out_dir.join(name)
    }

    /// Numeric columns paired with their non-null values.
    fn numeric_values(table: &Table, profile: &Profile) -> Result<Vec<(String, Vec<f64>)>> {
        profile
            .numeric_columns()
            .into_iter()
            .map(|name| Ok((name.to_string(), non_null_f64(table.series(name)?)?)))
            .collect()
    }

    /// Grid of per-column panels; one panel per numeric column.
    fn render_panels(
        &self,
        name: &str,
        columns: &[(String, Vec<f64>)],
        draw: fn(&charts::Area<'_>, &str, &[f64]) -> charts::DrawResult<()>,
    ) -> Result<Artifact> {
        let (rows, cols) = grid_shape(columns.len());
        let size = (PANEL_WIDTH * cols as u32, PANEL_HEIGHT * rows as u32);
        let path = self.target(name);

        render_png(&path, size, |root| {
            let panels = root.split_evenly((rows, cols));
            for (area, (column, values)) in panels.iter().zip(columns) {
                draw(area, column, values)?;
            }
            Ok(())
        })?;
        Ok(Artifact::image(name, path, columns.len()))
    }

    pub fn render_histograms(&self, table: &Table, profile: &Profile) -> Result<Option<Artifact>> {
        if !profile.has_numeric_columns() {
            return Ok(None);
        }
        let columns = Self::numeric_values(table, profile)?;
        self.render_panels(NUMERIC_HISTOGRAMS, &columns, draw_histogram)
            .map(Some)
    }

    pub fn render_boxplots(&self, table: &Table, profile: &Profile) -> Result<Option<Artifact>> {
        if !profile.has_numeric_columns() {
            return Ok(None);
        }
        let columns = Self::numeric_values(table, profile)?;
        self.render_panels(NUMERIC_BOXPLOTS, &columns, draw_boxplot)
            .map(Some)
    }

    pub fn render_correlation(&self, profile: &Profile) -> Result<Option<Artifact>> {
        let Some(matrix) = profile.correlation.as_ref().filter(|m| !m.is_empty()) else {
            return Ok(None);
        };
        self.render_heatmap(matrix).map(Some)
    }

    fn render_heatmap(&self, matrix: &CorrelationMatrix) -> Result<Artifact> {
        let side = (260 + 90 * matrix.len() as u32).clamp(600, 2400);
        let path = self.target(CORRELATION_MATRIX);
        render_png(&path, (side, side), |root| draw_heatmap(root, matrix))?;
        Ok(Artifact::image(CORRELATION_MATRIX, path, 1))
    }

    /// Missing-value counts for every column, drawn even when all are zero.
    pub fn render_missing_values(&self, profile: &Profile) -> Result<Artifact> {
        let labels: Vec<String> = profile.columns.iter().map(|c| c.name.clone()).collect();
        let counts: Vec<f64> = profile.columns.iter().map(|c| c.missing as f64).collect();

        let width = (200 + 60 * labels.len() as u32).clamp(800, 3000);
        let path = self.target(MISSING_VALUES);
        render_png(&path, (width, 600), |root| {
            draw_bars(root, "Missing Values by Column", "Missing Count", &labels, &counts)
        })?;
        Ok(Artifact::image(MISSING_VALUES, path, 1))
    }

    pub fn render_time_series(&self, table: &Table) -> Result<Option<Artifact>> {
        let Some(date_column) = find_date_column(table) else {
            return Ok(None);
        };
        let Some(series) = resample_monthly(table, &date_column)? else {
            return Ok(None);
        };

        let path = self.target(TIME_SERIES);
        let title = format!("Monthly Averages by {}", series.date_column);
        let labels = series.month_labels();
        render_png(&path, (1500, 600), |root| {
            draw_lines(root, &title, &labels, &series.columns)
        })?;
        Ok(Some(Artifact::image(TIME_SERIES, path, 1)))
    }

    /// Bar chart of a feature importance ranking, most important first.
    pub fn render_feature_importance(&self, ranking: &FeatureImportanceRanking) -> Result<Artifact> {
        if ranking.is_empty() {
            return Err(AnalysisError::RenderFailed {
                artifact: FEATURE_IMPORTANCE.to_string(),
                reason: "empty ranking".to_string(),
            });
        }
        std::fs::create_dir_all(&self.out_dir)
            .map_err(|e| AnalysisError::from_io(&self.out_dir, e))?;

        let labels: Vec<String> = ranking.features().into_iter().map(str::to_string).collect();
        let scores: Vec<f64> = ranking.entries.iter().map(|e| e.importance).collect();

        let width = (200 + 60 * labels.len() as u32).clamp(800, 3000);
        let path = self.target(FEATURE_IMPORTANCE);
        render_png(&path, (width, 600), |root| {
            draw_bars(root, "Feature Importance", "Importance", &labels, &scores)
        })?;
        info!("Saved {}", path.display());
        Ok(Artifact::image(FEATURE_IMPORTANCE, path, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DatasetLoader;
    use crate::profiler::StatisticalProfiler;

    fn names(artifacts: &[Artifact]) -> Vec<&str> {
        artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_text_only_table_gets_missing_values_chart_only() {
        let dir = tempfile::tempdir().unwrap();
        let table = DatasetLoader::from_text("name,city\na,x\nb,\nc,z\n").unwrap();
        let profile = StatisticalProfiler::profile(&table).unwrap();

        let artifacts = VisualizationSelector::new(dir.path()).render(&table, &profile);
        assert_eq!(names(&artifacts), vec![MISSING_VALUES]);
        assert!(dir.path().join(MISSING_VALUES).exists());
        assert!(!dir.path().join(NUMERIC_HISTOGRAMS).exists());
    }

    #[test]
    fn test_histogram_panels_match_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let table = DatasetLoader::from_text(
            "a,b,c,label\n1,2.5,3,x\n2,3.5,1,y\n3,1.5,4,z\n4,0.5,2,w\n",
        )
        .unwrap();
        let profile = StatisticalProfiler::profile(&table).unwrap();
        let selector = VisualizationSelector::new(dir.path());

        let hist = selector.render_histograms(&table, &profile).unwrap().unwrap();
        assert_eq!(hist.panels, 3);
        let boxes = selector.render_boxplots(&table, &profile).unwrap().unwrap();
        assert_eq!(boxes.panels, 3);
    }

    #[test]
    fn test_dated_table_gets_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("date,revenue,units\n");
        for i in 0..24 {
            csv.push_str(&format!(
                "2024-{:02}-{:02},{},{}\n",
                i % 12 + 1,
                i % 27 + 1,
                100 + i * 3,
                i % 5
            ));
        }
        let table = DatasetLoader::from_text(csv).unwrap();
        let profile = StatisticalProfiler::profile(&table).unwrap();

        let artifacts = VisualizationSelector::new(dir.path()).render(&table, &profile);
        assert_eq!(
            names(&artifacts),
            vec![
                NUMERIC_HISTOGRAMS,
                NUMERIC_BOXPLOTS,
                CORRELATION_MATRIX,
                MISSING_VALUES,
                TIME_SERIES
            ]
        );
        for artifact in &artifacts {
            assert!(artifact.path.exists(), "{} not written", artifact.name);
        }
    }

    #[test]
    fn test_feature_importance_chart() {
        let dir = tempfile::tempdir().unwrap();
        let ranking = FeatureImportanceRanking::from_scores(
            &["x".to_string(), "y".to_string()],
            &[0.3, 0.7],
        );
        let artifact = VisualizationSelector::new(dir.path())
            .render_feature_importance(&ranking)
            .unwrap();
        assert_eq!(artifact.name, FEATURE_IMPORTANCE);
        assert!(artifact.path.exists());
    }

    #[test]
    fn test_empty_ranking_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = VisualizationSelector::new(dir.path())
            .render_feature_importance(&FeatureImportanceRanking::default());
        assert!(matches!(result, Err(AnalysisError::RenderFailed { .. })));
    }
}
