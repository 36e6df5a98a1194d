//! Generative-AI collaborator: the [`TextService`] seam, credential rotation,
//! and the AI-backed pipeline steps (whole-text cleanup, article repair, gap
//! completion, gap explanation).
//!
//! Every step degrades to "input unchanged" on service failure or malformed
//! output; none of them return errors to the caller.

pub mod completion;
pub mod credentials;
mod error;
pub mod explain;
#[cfg(feature = "http")]
pub mod gemini;
pub mod json;
pub mod prompts;
pub mod repair;
mod service;
pub mod text_cleanup;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use completion::{Completion, complete_gaps};
pub use credentials::CredentialPool;
pub use error::AiError;
pub use explain::{GapExplanation, explain_gaps};
#[cfg(feature = "http")]
pub use gemini::GeminiClient;
pub use repair::{RepairFlag, RepairReport, repair_articles, scan_article};
pub use service::TextService;
pub use text_cleanup::{CleanupVerdict, clean_text};
