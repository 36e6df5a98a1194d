//! Rotating pool of API credentials.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use crate::error::AiError;

/// A fixed set of API keys handed out round-robin.
///
/// Callers rotate with [`next`](Self::next) after a rate-limit or forbidden
/// response and give up with [`exhausted`](Self::exhausted) once every key
/// has been tried for the same request.
#[derive(Debug, Default)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .map(|k: String| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parse a comma-separated key list.
    pub fn from_csv(s: &str) -> Self {
        Self::new(s.split(','))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The next key, cycling through the pool.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Result<&str, AiError> {
        if self.keys.is_empty() {
            return Err(AiError::NoCredentials);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Ok(&self.keys[i])
    }

    /// Error for a request that has been refused under every key.
    pub fn exhausted(&self) -> AiError {
        if self.keys.is_empty() {
            AiError::NoCredentials
        } else {
            AiError::CredentialsExhausted {
                tried: self.keys.len(),
            }
        }
    }

    /// Run `request` under successive keys until one is not refused.
    ///
    /// Rate-limited and forbidden answers move on to the next key; any other
    /// result, success or failure, is returned as is. Each key is tried at
    /// most once per call.
    pub async fn rotate<'a, T, F, Fut>(&'a self, mut request: F) -> Result<T, AiError>
    where
        F: FnMut(&'a str) -> Fut,
        Fut: Future<Output = Result<T, AiError>>,
    {
        for _ in 0..self.keys.len() {
            let key = self.next()?;
            match request(key).await {
                Err(e) if e.is_rotatable() => {
                    warn!(error = %e, "AI credential refused, rotating");
                }
                other => return other,
            }
        }
        Err(self.exhausted())
    }
}
