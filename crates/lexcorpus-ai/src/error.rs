use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    #[error("no AI credentials configured")]
    NoCredentials,

    #[error("all {tried} AI credentials rejected or rate-limited")]
    CredentialsExhausted { tried: usize },

    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },

    #[error("credential forbidden (status {status})")]
    Forbidden { status: u16 },

    #[error("AI service returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("AI request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("malformed AI response: {0}")]
    Malformed(String),
}

impl AiError {
    /// Whether the next credential should be tried.
    pub fn is_rotatable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Forbidden { .. })
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
