//! Scripted text service for tests: answers by matching prompt substrings.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AiError;
use crate::service::TextService;

/// A [`TextService`] that replies from a fixed script.
///
/// Rules are checked in insertion order; the first whose needle occurs in
/// the prompt answers. Prompts matching no rule get a 503 error.
#[derive(Default)]
pub struct ScriptedService {
    rules: Vec<(String, Result<String, AiError>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to prompts containing `needle`.
    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(response.to_string())));
        self
    }

    /// Fail prompts containing `needle` with `error`.
    pub fn fail_on(mut self, needle: &str, error: AiError) -> Self {
        self.rules.push((needle.to_string(), Err(error)));
        self
    }

    /// Every prompt received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextService for ScriptedService {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.to_string());
        }
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| {
                Err(AiError::Server {
                    status: 503,
                    body: "no scripted response".into(),
                })
            })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
