//! Narrative provider trait for abstracting LLM interactions.
//!
//! This module defines the [`NarrativeProvider`] trait so the report can be
//! written by any chat-completions style backend, or by a stub in tests,
//! without changing the composer.
//!
//! # Example
//!
//! ```rust,ignore
//! use autolysis::ai::{ChatCompletionsProvider, NarrativeProvider, NarrativeRequest};
//!
//! let provider = ChatCompletionsProvider::new("your-api-key")?;
//! let text = provider.generate(&NarrativeRequest::new("system", "user"))?;
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// The two messages of a narrative request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    /// Persona and style instructions, sent with the `system` role.
    pub system: String,
    /// Context payload and required sections, sent with the `user` role.
    pub user: String,
}

impl NarrativeRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Trait for services that turn a prompt into report text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage across threads.
///
/// # Error Handling
///
/// Implementations return the content verbatim. Deciding whether blank
/// content is acceptable is left to the caller; transport and status
/// failures are reported as errors and never retried.
pub trait NarrativeProvider: Send + Sync {
    /// Send one request and return the first choice's message content.
    ///
    /// Returns an empty string when the service answered successfully but
    /// without content.
    fn generate(&self, request: &NarrativeRequest) -> Result<String>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}
