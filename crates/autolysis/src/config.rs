//! Configuration types for an analysis run.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Settings of the narrative
//! service itself live with the provider, see
//! [`ChatCompletionsConfig`](crate::ai::ChatCompletionsConfig).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Column name that enables feature-importance estimation.
pub const DEFAULT_TARGET_COLUMN: &str = "target";

/// Environment variable holding the narrative service bearer token.
pub const DEFAULT_CREDENTIAL_ENV: &str = "AIPROXY_TOKEN";

/// Configuration for the analysis pipeline.
///
/// Use [`ReportConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use autolysis::config::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .work_dir("/tmp/autolysis")
///     .n_estimators(50)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory where charts and README.md are generated before relocation.
    /// Default: "." (the current working directory)
    pub work_dir: PathBuf,

    /// Destination folder for the generated files.
    /// If None, the directory containing the input file is used.
    /// Default: None
    pub output_dir: Option<PathBuf>,

    /// Column used as the label for feature importance.
    /// Default: "target"
    pub target_column: String,

    /// Number of trees in the random forest.
    /// Default: 100
    pub n_estimators: usize,

    /// Seed for bootstrap sampling, keeps rankings reproducible.
    /// Default: 42
    pub random_seed: u64,

    /// Whether to move the generated files into the output folder.
    /// Default: true
    pub relocate_outputs: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            output_dir: None,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            n_estimators: 100,
            random_seed: 42,
            relocate_outputs: true,
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("target_column".to_string()));
        }

        if self.n_estimators == 0 {
            return Err(ConfigValidationError::InvalidEstimators(self.n_estimators));
        }

        if self.work_dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyField("work_dir".to_string()));
        }

        Ok(())
    }

    /// Folder the outputs end up in for a given input file.
    ///
    /// An explicit `output_dir` wins; otherwise the input's parent directory,
    /// falling back to the current directory for bare file names.
    pub fn resolve_output_dir(&self, input: &Path) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Configuration field '{0}' must not be empty")]
    EmptyField(String),

    #[error("Invalid number of estimators: {0} (must be at least 1)")]
    InvalidEstimators(usize),

    #[error("Invalid timeout: {0}s (must be at least 1)")]
    InvalidTimeout(u64),
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    work_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    target_column: Option<String>,
    n_estimators: Option<usize>,
    random_seed: Option<u64>,
    relocate_outputs: Option<bool>,
}

impl ReportConfigBuilder {
    /// Set the directory where artifacts are generated.
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    /// Set an explicit destination folder.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the label column for feature importance.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the number of trees in the forest.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Set the bootstrap seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Enable or disable moving outputs into the destination folder.
    pub fn relocate_outputs(mut self, relocate: bool) -> Self {
        self.relocate_outputs = Some(relocate);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let config = ReportConfig {
            work_dir: self.work_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_dir: self.output_dir,
            target_column: self
                .target_column
                .unwrap_or_else(|| DEFAULT_TARGET_COLUMN.to_string()),
            n_estimators: self.n_estimators.unwrap_or(100),
            random_seed: self.random_seed.unwrap_or(42),
            relocate_outputs: self.relocate_outputs.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("."));
        assert_eq!(config.target_column, "target");
        assert_eq!(config.n_estimators, 100);
        assert!(config.output_dir.is_none());
        assert!(config.relocate_outputs);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ReportConfig::builder()
            .work_dir("/tmp/work")
            .output_dir("/tmp/out")
            .target_column("label")
            .n_estimators(10)
            .random_seed(7)
            .relocate_outputs(false)
            .build()
            .unwrap();

        assert_eq!(config.work_dir, PathBuf::from("/tmp/work"));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.target_column, "label");
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.random_seed, 7);
        assert!(!config.relocate_outputs);
    }

    #[test]
    fn test_validation_zero_estimators() {
        let result = ReportConfig::builder().n_estimators(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidEstimators(0)
        ));
    }

    #[test]
    fn test_validation_blank_target() {
        let result = ReportConfig::builder().target_column("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyField(_)
        ));
    }

    #[test]
    fn test_resolve_output_dir_uses_input_parent() {
        let config = ReportConfig::default();
        assert_eq!(
            config.resolve_output_dir(Path::new("data/sales/sales.csv")),
            PathBuf::from("data/sales")
        );
    }

    #[test]
    fn test_resolve_output_dir_bare_file_name() {
        let config = ReportConfig::default();
        assert_eq!(
            config.resolve_output_dir(Path::new("sales.csv")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_resolve_output_dir_explicit_override() {
        let config = ReportConfig::builder().output_dir("reports").build().unwrap();
        assert_eq!(
            config.resolve_output_dir(Path::new("data/sales.csv")),
            PathBuf::from("reports")
        );
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "work_dir": "scratch",
            "output_dir": null,
            "target_column": "price",
            "n_estimators": 25,
            "random_seed": 1,
            "relocate_outputs": true
        }"#;

        let config: ReportConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.work_dir, PathBuf::from("scratch"));
        assert_eq!(config.target_column, "price");
        assert_eq!(config.n_estimators, 25);
    }
}
