//! Client for the language-model completion capability.
//!
//! Strategies consume the capability through [`TextGenerator`] so tests can
//! substitute a mock; [`OllamaClient`] is the production implementation.

mod client;
mod error;

pub use client::OllamaClient;
pub use error::{LlmError, Result};

use async_trait::async_trait;

/// The completion capability: plain text or a single structured JSON object.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Request a single JSON object. Fails with [`LlmError::Malformed`]
    /// when the model returns something that does not parse.
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value>;
}
