//! README.md composition.
//!
//! The composer condenses the profile into a [`NarrativeContext`], asks the
//! narrative provider for a report in five fixed sections and writes the
//! answer verbatim to `README.md`. Blank answers abort the run: no
//! placeholder document is ever written.

use crate::ai::{NarrativeProvider, NarrativeRequest};
use crate::error::{AnalysisError, Result};
use crate::types::{Artifact, ArtifactKind, ColumnSummary, CorrelationMatrix, NumericSummary, Profile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// File name of the generated report.
pub const README_FILE: &str = "README.md";

/// Marker sent in place of the matrix when the table had no numeric columns.
pub const NO_CORRELATION_MARKER: &str = "No correlation matrix available";

const SYSTEM_PROMPT: &str = "You are a data science expert and a storyteller. Your task is to \
analyze the provided dataset and create a compelling README.md that clearly explains the data \
and insights. Ensure the narrative is structured, engaging, and uses appropriate sections, \
bullet points, and emphasis.";

/// Shape and per-column layout, the equivalent of a dataframe info dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub rows: usize,
    pub columns: usize,
    pub entries: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeEntry {
    pub column: String,
    pub dtype: String,
}

/// Either the matrix or the explicit "not available" marker. The key is
/// always present in the serialized context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationField {
    Matrix(CorrelationMatrix),
    Unavailable(String),
}

/// Everything the narrative service sees about the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeContext {
    pub column_info: ColumnInfo,
    pub summary_stats: Vec<NumericSummary>,
    pub missing_values: Vec<MissingCount>,
    pub data_types: Vec<DataTypeEntry>,
    pub correlation_matrix: CorrelationField,
    /// Image files rendered for this run, referenced from the report.
    pub visualizations: Vec<String>,
}

impl NarrativeContext {
    pub fn from_profile(profile: &Profile, artifacts: &[Artifact]) -> Self {
        Self {
            column_info: ColumnInfo {
                rows: profile.shape.0,
                columns: profile.shape.1,
                entries: profile.columns.clone(),
            },
            summary_stats: profile.summary_stats.clone(),
            missing_values: profile
                .columns
                .iter()
                .map(|c| MissingCount {
                    column: c.name.clone(),
                    missing: c.missing,
                })
                .collect(),
            data_types: profile
                .columns
                .iter()
                .map(|c| DataTypeEntry {
                    column: c.name.clone(),
                    dtype: c.dtype.clone(),
                })
                .collect(),
            correlation_matrix: match &profile.correlation {
                Some(matrix) => CorrelationField::Matrix(matrix.clone()),
                None => CorrelationField::Unavailable(NO_CORRELATION_MARKER.to_string()),
            },
            visualizations: artifacts
                .iter()
                .filter(|a| a.kind == ArtifactKind::Image)
                .map(|a| a.name.clone())
                .collect(),
        }
    }

    /// Build the request: persona as system message, context and the five
    /// required sections as user message.
    pub fn to_request(&self) -> Result<NarrativeRequest> {
        let context = serde_json::to_string(self)?;

        let images = if self.visualizations.is_empty() {
            "No visualizations were produced for this dataset; say so briefly.".to_string()
        } else {
            let list = self
                .visualizations
                .iter()
                .map(|name| format!("![{}]({})", name.trim_end_matches(".png"), name))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Embed each of these images, which reside in the same directory as README.md, \
                 using exactly these file names: {}",
                list
            )
        };

        let user = format!(
            "Given the following context:\n\n{}\n\n\
             Write a comprehensive README.md that includes:\n\
             1. A brief description of the dataset.\n\
             2. Key insights from the analysis (Mention all the points).\n\
             3. Visualizations used and their interpretations. {}\n\
             4. Potential implications of the findings for practical applications.\n\
             5. Any limitations or considerations to keep in mind when using this data.",
            context, images
        );

        Ok(NarrativeRequest::new(SYSTEM_PROMPT, user))
    }
}

/// Stages of a single composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeStage {
    Idle,
    ContextBuilt,
    RequestSent,
    ResponseAccepted,
    DocumentWritten,
    RequestFailed,
    Aborted,
}

impl NarrativeStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ContextBuilt => "Context Built",
            Self::RequestSent => "Request Sent",
            Self::ResponseAccepted => "Response Accepted",
            Self::DocumentWritten => "Document Written",
            Self::RequestFailed => "Request Failed",
            Self::Aborted => "Aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DocumentWritten | Self::Aborted)
    }
}

/// Writes README.md through a [`NarrativeProvider`].
pub struct NarrativeComposer {
    provider: Arc<dyn NarrativeProvider>,
    stage: NarrativeStage,
}

impl NarrativeComposer {
    pub fn new(provider: Arc<dyn NarrativeProvider>) -> Self {
        Self {
            provider,
            stage: NarrativeStage::Idle,
        }
    }

    /// Stage reached by the last call to [`compose`](Self::compose).
    pub fn stage(&self) -> NarrativeStage {
        self.stage
    }

    fn advance(&mut self, stage: NarrativeStage) {
        debug!(
            "Narrative: {} -> {}",
            self.stage.display_name(),
            stage.display_name()
        );
        self.stage = stage;
    }

    /// Compose the report and write it to `work_dir/README.md`.
    ///
    /// # Errors
    ///
    /// - Transport or status failures from the provider, unchanged
    /// - [`AnalysisError::EmptyNarrative`] when the content is blank
    /// - I/O errors while writing the file
    pub fn compose(
        &mut self,
        profile: &Profile,
        artifacts: &[Artifact],
        work_dir: &Path,
    ) -> Result<Artifact> {
        self.stage = NarrativeStage::Idle;

        let request = NarrativeContext::from_profile(profile, artifacts).to_request()?;
        self.advance(NarrativeStage::ContextBuilt);

        info!(
            "Requesting narrative from {} ({})",
            self.provider.name(),
            self.provider.model().unwrap_or("default model")
        );
        self.advance(NarrativeStage::RequestSent);

        let narrative = match self.provider.generate(&request) {
            Ok(text) => text,
            Err(e) => {
                error!("Narrative request failed: {}", e);
                self.advance(NarrativeStage::RequestFailed);
                self.advance(NarrativeStage::Aborted);
                return Err(e);
            }
        };

        if narrative.trim().is_empty() {
            error!("Received an empty response from the narrative service");
            self.advance(NarrativeStage::Aborted);
            return Err(AnalysisError::EmptyNarrative);
        }
        self.advance(NarrativeStage::ResponseAccepted);

        std::fs::create_dir_all(work_dir).map_err(|e| AnalysisError::from_io(work_dir, e))?;
        let path = work_dir.join(README_FILE);
        std::fs::write(&path, &narrative).map_err(|e| AnalysisError::from_io(&path, e))?;
        self.advance(NarrativeStage::DocumentWritten);

        info!("README.md has been created successfully");
        Ok(Artifact::document(README_FILE, path))
    }
}
