//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::CredentialPool;
use crate::error::AiError;
use crate::service::TextService;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini text client with credential rotation.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    pool: CredentialPool,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a client for `model` using the keys in `pool`.
    pub fn new(
        pool: CredentialPool,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            pool,
            temperature: 0.1,
            max_output_tokens: 65_536,
        })
    }

    /// Point the client at another endpoint (no trailing slash needed).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = n;
        self
    }

    async fn call(&self, key: &str, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling generateContent");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AiError::Malformed("empty candidate".into()));
        }
        Ok(text)
    }
}

/// Map a non-success status to the error that drives key rotation.
fn status_error(status: u16, body: String) -> AiError {
    match status {
        429 => AiError::RateLimited { status },
        401 | 403 => AiError::Forbidden { status },
        _ => AiError::Server { status, body },
    }
}

#[async_trait]
impl TextService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.pool.rotate(|key| self.call(key, prompt)).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
