//! Automated dataset analysis and reporting.
//!
//! Given a CSV file, this library profiles every column, renders a standard
//! chart set, optionally ranks features against a `target` column, asks an
//! LLM to write a `README.md` about the findings and moves the report next to
//! the dataset.
//!
//! # Overview
//!
//! - **Loading**: Latin-1 tolerant CSV parsing with date column coercion
//! - **Profiling**: Descriptive statistics, missing counts, Pearson correlation
//! - **Charts**: Histograms, boxplots, correlation heatmap, missing values,
//!   monthly time series and feature importance, drawn with plotters
//! - **Feature Importance**: Random-forest impurity ranking
//! - **Narrative**: One chat-completions request producing README.md
//! - **Assembly**: Outputs relocated into the input file's folder
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use autolysis::{AnalysisPipeline, ReportConfig};
//! use autolysis::ai::ChatCompletionsProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(ChatCompletionsProvider::new(std::env::var("AIPROXY_TOKEN")?)?);
//!
//! let report = AnalysisPipeline::builder()
//!     .config(ReportConfig::builder().work_dir("/tmp/autolysis").build()?)
//!     .provider(provider)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run("data/sales.csv")?;
//!
//! for artifact in &report.artifacts {
//!     println!("{}", artifact.path.display());
//! }
//! ```
//!
//! # Individual Stages
//!
//! Each stage is usable on its own:
//!
//! ```rust,ignore
//! use autolysis::{DatasetLoader, StatisticalProfiler, VisualizationSelector};
//!
//! let table = DatasetLoader::load("data/sales.csv")?;
//! let profile = StatisticalProfiler::profile(&table)?;
//! let charts = VisualizationSelector::new("charts").render(&table, &profile);
//! ```
//!
//! # Fonts
//!
//! Chart text is drawn with DejaVu Sans, compiled into the binary and
//! registered with plotters on first use, so no system fonts are needed.

pub mod ai;
pub mod config;
pub mod error;
pub mod importance;
pub mod loader;
pub mod narrative;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;
pub mod visuals;

pub use config::{ConfigValidationError, ReportConfig, ReportConfigBuilder};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use importance::{FeatureImportanceEstimator, RandomForestRegressor};
pub use loader::DatasetLoader;
pub use narrative::{NarrativeComposer, NarrativeContext, NarrativeStage};
pub use pipeline::{
    AnalysisPipeline, AnalysisPipelineBuilder, AnalysisReport, PipelineStage, ProgressReporter,
    ProgressUpdate,
};
pub use profiler::StatisticalProfiler;
pub use reporting::ReportAssembler;
pub use types::{
    Artifact, ArtifactKind, ColumnKind, ColumnSummary, CorrelationMatrix, FeatureImportance,
    FeatureImportanceRanking, NumericSummary, Profile, Table,
};
pub use visuals::VisualizationSelector;
