//! OpenAI-compatible chat-completions provider.
//!
//! This module provides the [`ChatCompletionsProvider`] which implements the
//! [`NarrativeProvider`] trait for any endpoint speaking the chat-completions
//! JSON contract. The default endpoint is the AI Proxy in front of OpenAI.

use super::{NarrativeProvider, NarrativeRequest};
use crate::config::ConfigValidationError;
use crate::error::{AnalysisError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default chat-completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://aiproxy.sanand.workers.dev/openai/v1/chat/completions";

/// Default model for report writing.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default timeout for API requests in seconds. Long reports take a while.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a response body, defaulting to
/// an empty string at every missing level.
fn extract_content(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    Ok(response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default())
}

/// Configuration for the chat-completions provider.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// The model to use (e.g., "gpt-4o-mini").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Full URL of the chat-completions endpoint.
    pub base_url: String,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ChatCompletionsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ChatCompletionsConfigBuilder {
        ChatCompletionsConfigBuilder::default()
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("model".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("base_url".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }
}

/// Builder for [`ChatCompletionsConfig`].
#[derive(Default)]
pub struct ChatCompletionsConfigBuilder {
    model: Option<String>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl ChatCompletionsConfigBuilder {
    /// Set the model to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set a custom endpoint URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> std::result::Result<ChatCompletionsConfig, ConfigValidationError> {
        let config = ChatCompletionsConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Chat-completions provider for writing the report narrative.
///
/// # Example
///
/// ```rust,ignore
/// use autolysis::ai::{ChatCompletionsConfig, ChatCompletionsProvider};
///
/// // Simple usage with defaults
/// let provider = ChatCompletionsProvider::new(token)?;
///
/// // With custom configuration
/// let config = ChatCompletionsConfig::builder()
///     .model("gpt-4o")
///     .timeout_secs(120)
///     .build()?;
/// let provider = ChatCompletionsProvider::with_config(token, config)?;
/// ```
pub struct ChatCompletionsProvider {
    api_key: String,
    config: ChatCompletionsConfig,
    client: Client,
}

static_assertions::assert_impl_all!(ChatCompletionsProvider: Send, Sync);

impl ChatCompletionsProvider {
    /// Create a provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or the HTTP client cannot be
    /// created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ChatCompletionsConfig::default())
    }

    /// Create a provider with custom configuration.
    pub fn with_config(api_key: impl Into<String>, config: ChatCompletionsConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::MissingCredential(
                crate::config::DEFAULT_CREDENTIAL_ENV.to_string(),
            ));
        }
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AnalysisError::NarrativeRequestFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }
}

impl NarrativeProvider for ChatCompletionsProvider {
    fn generate(&self, request: &NarrativeRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        debug!("POST {} (model {})", self.config.base_url, self.config.model);
        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| AnalysisError::NarrativeRequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| AnalysisError::NarrativeRequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(AnalysisError::NarrativeStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_content(&text)
    }

    fn name(&self) -> &str {
        "ChatCompletions"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Response parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_content_first_choice() {
        let body = r##"{"choices":[{"message":{"role":"assistant","content":"# Report"}},{"message":{"content":"other"}}]}"##;
        assert_eq!(extract_content(body).unwrap(), "# Report");
    }

    #[test]
    fn test_extract_content_missing_levels_are_empty() {
        assert_eq!(extract_content(r#"{}"#).unwrap(), "");
        assert_eq!(extract_content(r#"{"choices":[]}"#).unwrap(), "");
        assert_eq!(extract_content(r#"{"choices":[{}]}"#).unwrap(), "");
        assert_eq!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(),
            ""
        );
    }

    #[test]
    fn test_extract_content_rejects_invalid_json() {
        assert!(matches!(
            extract_content("not json"),
            Err(AnalysisError::Json(_))
        ));
    }

    #[test]
    fn test_request_serialization() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                Message {
                    role: "system",
                    content: "persona",
                },
                Message {
                    role: "user",
                    content: "context",
                },
            ],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "context");
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_config() {
        let config = ChatCompletionsConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = ChatCompletionsConfig::builder().timeout_secs(0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidTimeout(0))));
    }

    #[test]
    fn test_builder_rejects_empty_model() {
        let result = ChatCompletionsConfig::builder().model("  ").build();
        assert!(matches!(result, Err(ConfigValidationError::EmptyField(_))));
    }

    #[test]
    fn test_provider_requires_key() {
        let result = ChatCompletionsProvider::new("");
        assert!(matches!(result, Err(AnalysisError::MissingCredential(_))));
    }

    #[test]
    fn test_provider_metadata() {
        let config = ChatCompletionsConfig::builder().model("gpt-4o").build().unwrap();
        let provider = ChatCompletionsProvider::with_config("key", config).unwrap();
        assert_eq!(provider.name(), "ChatCompletions");
        assert_eq!(provider.model(), Some("gpt-4o"));
    }

    #[test]
    fn test_unreachable_endpoint_is_request_failure() {
        let config = ChatCompletionsConfig::builder()
            .base_url("http://127.0.0.1:9/v1/chat/completions")
            .timeout_secs(2)
            .build()
            .unwrap();
        let provider = ChatCompletionsProvider::with_config("key", config).unwrap();
        let result = provider.generate(&NarrativeRequest::new("s", "u"));
        assert!(matches!(result, Err(AnalysisError::NarrativeRequestFailed(_))));
    }
}
