use async_trait::async_trait;

use crate::error::AiError;

/// A generative text service: prompt in, text out.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;

    /// Model name for logs.
    fn model(&self) -> &str {
        "unknown"
    }
}
