use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::TextGenerator;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// HTTP client for an Ollama-style completion endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }

    async fn request(&self, prompt: &str, json_format: bool) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, json = json_format, "Sending completion request");

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: json_format.then_some("json"),
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| LlmError::Malformed {
                reason: e.to_string(),
                raw: String::new(),
            })?;

        Ok(parsed.response.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.request(prompt, false).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let raw = self.request(prompt, true).await?;
        parse_json_response(&raw)
    }
}

/// Parse a model response into a JSON object, tolerating the code fences
/// some models wrap their output in.
fn parse_json_response(raw: &str) -> Result<serde_json::Value> {
    let trimmed = strip_code_fences(raw);
    serde_json::from_str(trimmed).map_err(|e| LlmError::Malformed {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
