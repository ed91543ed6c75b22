//! Progress reporting for the analysis pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use autolysis::AnalysisPipeline;
//!
//! let report = AnalysisPipeline::builder()
//!     .provider(provider)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("data/sales.csv")?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of an analysis run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading and parsing the dataset
    Loading,
    /// Computing summary statistics and correlations
    Profiling,
    /// Rendering charts
    Visualizing,
    /// Fitting the forest against the target column
    FeatureImportance,
    /// Requesting and writing README.md
    Narrating,
    /// Moving outputs next to the dataset
    Assembling,
    /// Run completed successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Dataset",
            Self::Profiling => "Profiling Dataset",
            Self::Visualizing => "Rendering Charts",
            Self::FeatureImportance => "Estimating Feature Importance",
            Self::Narrating => "Writing Narrative",
            Self::Assembling => "Assembling Report",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Typical share of the run spent in this stage (0.0 - 1.0).
    ///
    /// The narrative request dominates wall time, so it gets the largest share.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.05,
            Self::Profiling => 0.05,
            Self::Visualizing => 0.20,
            Self::FeatureImportance => 0.10,
            Self::Narrating => 0.55,
            Self::Assembling => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Profiling => 0.05,
            Self::Visualizing => 0.10,
            Self::FeatureImportance => 0.30,
            Self::Narrating => 0.40,
            Self::Assembling => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,
    /// Overall progress (0.0 - 1.0)
    pub progress: f32,
    pub message: String,
}

impl ProgressUpdate {
    /// Update at a point within `stage` (`stage_progress` in 0.0 - 1.0).
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + stage.weight() * stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates during a run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}
