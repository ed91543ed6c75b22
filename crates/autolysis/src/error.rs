//! Error types for the analysis-and-reporting pipeline.
//!
//! Every fatal path of a run surfaces as an [`AnalysisError`]. The binary maps
//! the variants onto user-facing categories (file, permission, other) before
//! exiting with a nonzero status.

use crate::importance::ForestError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The dataset file does not exist.
    #[error("The input file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The process lacks permission to read or move a file.
    #[error("Permission denied for '{}': {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset could not be parsed into a table.
    #[error("Failed to load dataset: {0}")]
    LoadFailed(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The narrative service credential is not set.
    #[error("API token not set. Please set the '{0}' environment variable")]
    MissingCredential(String),

    /// The narrative request never produced a usable HTTP response.
    #[error("Narrative request failed: {0}")]
    NarrativeRequestFailed(String),

    /// The narrative service answered with a non-success status.
    #[error("Narrative service returned {status}: {body}")]
    NarrativeStatus { status: u16, body: String },

    /// The narrative service answered successfully but without content.
    #[error("Received an empty response from the narrative service")]
    EmptyNarrative,

    /// A chart could not be drawn or saved.
    #[error("Failed to render '{artifact}': {reason}")]
    RenderFailed { artifact: String, reason: String },

    /// Feature importance estimation failed.
    #[error("Failed to estimate feature importance: {0}")]
    EstimationFailed(#[from] ForestError),

    /// Moving the generated files into the output folder failed.
    #[error("Failed to move '{}' into the output folder: {reason}", .path.display())]
    RelocationFailed { path: PathBuf, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Map an IO error on `path` to the permission variant when applicable.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source: err },
            std::io::ErrorKind::NotFound => Self::FileNotFound(path),
            _ => Self::Io(err),
        }
    }

    /// Stable error code, used in logs and the serialized form.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::LoadFailed(_) => "LOAD_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::NarrativeRequestFailed(_) => "NARRATIVE_REQUEST_FAILED",
            Self::NarrativeStatus { .. } => "NARRATIVE_STATUS",
            Self::EmptyNarrative => "EMPTY_NARRATIVE",
            Self::RenderFailed { .. } => "RENDER_FAILED",
            Self::EstimationFailed(_) => "ESTIMATION_FAILED",
            Self::RelocationFailed { .. } => "RELOCATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AnalysisError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for missing or unreadable input files.
    pub fn is_file_error(&self) -> bool {
        matches!(self.root(), Self::FileNotFound(_))
    }

    /// True for permission failures while reading or relocating files.
    pub fn is_permission_error(&self) -> bool {
        matches!(self.root(), Self::PermissionDenied { .. })
    }

    /// True when the narrative stage failed (transport, status or content).
    pub fn is_narrative_error(&self) -> bool {
        matches!(
            self.root(),
            Self::NarrativeRequestFailed(_)
                | Self::NarrativeStatus { .. }
                | Self::EmptyNarrative
        )
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(AnalysisError::EmptyNarrative.error_code(), "EMPTY_NARRATIVE");
        assert_eq!(
            AnalysisError::FileNotFound(PathBuf::from("x.csv")).error_code(),
            "FILE_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_io_maps_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let mapped = AnalysisError::from_io("/secret.csv", err);
        assert!(mapped.is_permission_error());
        assert!(!mapped.is_file_error());
    }

    #[test]
    fn test_from_io_maps_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = AnalysisError::from_io("missing.csv", err);
        assert!(mapped.is_file_error());
        assert!(mapped.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_narrative_errors_are_grouped() {
        assert!(AnalysisError::EmptyNarrative.is_narrative_error());
        assert!(
            AnalysisError::NarrativeStatus {
                status: 502,
                body: "bad gateway".to_string()
            }
            .is_narrative_error()
        );
        assert!(!AnalysisError::LoadFailed("x".to_string()).is_narrative_error());
    }

    #[test]
    fn test_forest_error_converts_to_estimation_failed() {
        let error: AnalysisError = ForestError::NoRows.into();
        assert_eq!(error.error_code(), "ESTIMATION_FAILED");
        assert!(error.to_string().contains("no rows to fit"));
    }

    #[test]
    fn test_error_serialization() {
        let error = AnalysisError::MissingCredential("AIPROXY_TOKEN".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("MISSING_CREDENTIAL"));
        assert!(json.contains("AIPROXY_TOKEN"));
    }

    #[test]
    fn test_with_context() {
        let error = AnalysisError::EmptyNarrative.with_context("While composing README.md");
        assert!(error.to_string().contains("While composing README.md"));
        assert_eq!(error.error_code(), "EMPTY_NARRATIVE");
        assert!(error.is_narrative_error());
    }
}
