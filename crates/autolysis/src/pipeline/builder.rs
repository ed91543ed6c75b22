//! Main analysis pipeline.
//!
//! This module provides the [`AnalysisPipeline`] struct and builder for
//! orchestrating a run from dataset to relocated report.

use crate::ai::NarrativeProvider;
use crate::config::ReportConfig;
use crate::error::{AnalysisError, Result};
use crate::importance::FeatureImportanceEstimator;
use crate::loader::DatasetLoader;
use crate::narrative::NarrativeComposer;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::StatisticalProfiler;
use crate::reporting::ReportAssembler;
use crate::types::{Artifact, FeatureImportanceRanking, Profile};
use crate::visuals::VisualizationSelector;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub input: PathBuf,
    /// Folder the outputs were moved into.
    pub output_dir: PathBuf,
    pub profile: Profile,
    /// Every file produced, with its final location.
    pub artifacts: Vec<Artifact>,
    pub feature_importance: Option<FeatureImportanceRanking>,
    pub relocated: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl AnalysisReport {
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}

/// Runs the stages in order: load, profile, visualize, estimate feature
/// importance, narrate, assemble.
///
/// Use [`AnalysisPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use autolysis::{AnalysisPipeline, ReportConfig};
/// use autolysis::ai::ChatCompletionsProvider;
/// use std::sync::Arc;
///
/// let provider = Arc::new(ChatCompletionsProvider::new(token)?);
/// let report = AnalysisPipeline::builder()
///     .config(ReportConfig::builder().work_dir("/tmp/run").build()?)
///     .provider(provider)
///     .build()?
///     .run("data/sales.csv")?;
/// ```
pub struct AnalysisPipeline {
    config: ReportConfig,
    provider: Arc<dyn NarrativeProvider>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(AnalysisPipeline: Send);

impl AnalysisPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Analyze the dataset at `path` and place the report next to it.
    ///
    /// # Errors
    ///
    /// Loading, narrative and relocation failures abort the run. Chart
    /// failures do not; they are logged and the chart is left out.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        match self.run_internal(path.as_ref()) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete("Analysis completed successfully"));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error [{}]: {}", e.error_code(), e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn enter(&self, stage: PipelineStage) {
        info!("{}...", stage.display_name());
        self.report_progress(ProgressUpdate::new(stage, 0.0, stage.display_name()));
    }

    fn run_internal(&self, path: &Path) -> Result<AnalysisReport> {
        let start_time = Instant::now();
        let work_dir = self.config.work_dir.as_path();
        info!("Starting analysis of {}", path.display());

        self.enter(PipelineStage::Loading);
        let table = DatasetLoader::load(path)?;

        self.enter(PipelineStage::Profiling);
        let profile = StatisticalProfiler::profile(&table)?;

        self.enter(PipelineStage::Visualizing);
        let mut artifacts = VisualizationSelector::new(work_dir).render(&table, &profile);

        self.enter(PipelineStage::FeatureImportance);
        let feature_importance = match FeatureImportanceEstimator::from_config(&self.config)
            .estimate_and_render(&table, &profile, work_dir)?
        {
            Some((ranking, chart)) => {
                artifacts.extend(chart);
                Some(ranking)
            }
            None => None,
        };

        self.enter(PipelineStage::Narrating);
        let readme = NarrativeComposer::new(Arc::clone(&self.provider)).compose(
            &profile,
            &artifacts,
            work_dir,
        )?;
        artifacts.push(readme);

        self.enter(PipelineStage::Assembling);
        let output_dir = self.config.resolve_output_dir(path);
        let relocated = if self.config.relocate_outputs {
            let moved = ReportAssembler::relocate(&ReportAssembler::outputs(&artifacts), &output_dir)?;
            for artifact in &mut artifacts {
                if let Some(dest) = moved
                    .iter()
                    .find(|p| p.file_name() == artifact.path.file_name())
                {
                    artifact.path = dest.clone();
                }
            }
            moved
        } else {
            Vec::new()
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Analysis finished in {} ms: {} files in {}",
            duration_ms,
            artifacts.len(),
            output_dir.display()
        );

        Ok(AnalysisReport {
            input: path.to_path_buf(),
            output_dir,
            profile,
            artifacts,
            feature_importance,
            relocated,
            duration_ms,
        })
    }
}

/// Builder for [`AnalysisPipeline`].
#[derive(Default)]
pub struct AnalysisPipelineBuilder {
    config: Option<ReportConfig>,
    provider: Option<Arc<dyn NarrativeProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(AnalysisPipelineBuilder: Send);

impl AnalysisPipelineBuilder {
    /// Set the run configuration.
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the service that writes README.md.
    pub fn provider(mut self, provider: Arc<dyn NarrativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a closure to receive progress updates.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if the configuration does not
    /// validate or no narrative provider was set.
    pub fn build(self) -> Result<AnalysisPipeline> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;

        let provider = self.provider.ok_or_else(|| {
            AnalysisError::InvalidConfig("a narrative provider is required".to_string())
        })?;

        Ok(AnalysisPipeline {
            config,
            provider,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NarrativeRequest;

    struct Echo;

    impl NarrativeProvider for Echo {
        fn generate(&self, _request: &NarrativeRequest) -> Result<String> {
            Ok("# Report".to_string())
        }

        fn name(&self) -> &str {
            "Echo"
        }
    }

    #[test]
    fn test_build_requires_provider() {
        let result = AnalysisPipeline::builder().build();
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_validates_config() {
        let config = ReportConfig {
            n_estimators: 0,
            ..ReportConfig::default()
        };
        let result = AnalysisPipeline::builder()
            .config(config)
            .provider(Arc::new(Echo))
            .build();
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_input_reports_failure() {
        let stages = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = stages.clone();
        let pipeline = AnalysisPipeline::builder()
            .provider(Arc::new(Echo))
            .on_progress(move |u| sink.lock().unwrap().push(u.stage))
            .build()
            .unwrap();

        let err = pipeline.run("/no/such/dataset.csv").unwrap_err();
        assert!(err.is_file_error());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![PipelineStage::Loading, PipelineStage::Failed]
        );
    }
}
