//! AI module for writing the report narrative.
//!
//! This module provides a trait-based abstraction for narrative providers so
//! the composer works with any chat-completions backend.
//!
//! # Architecture
//!
//! The module is built around the [`NarrativeProvider`] trait. The concrete
//! implementation is:
//!
//! - [`ChatCompletionsProvider`] - OpenAI-compatible chat-completions API
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `src/ai/ollama.rs`)
//! 2. Implement the [`NarrativeProvider`] trait
//! 3. Export the new provider in this module
//!
//! # Example
//!
//! ```rust,ignore
//! use autolysis::ai::ChatCompletionsProvider;
//! use autolysis::AnalysisPipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(ChatCompletionsProvider::new(token)?);
//! let report = AnalysisPipeline::builder()
//!     .provider(provider)
//!     .build()?
//!     .run("data/sales.csv")?;
//! ```

mod chat_completions;
mod provider;

pub use chat_completions::{
    ChatCompletionsConfig, ChatCompletionsConfigBuilder, ChatCompletionsProvider,
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
pub use provider::{NarrativeProvider, NarrativeRequest};
