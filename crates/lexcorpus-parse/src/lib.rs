//! Statute text extraction: sanitizer, line classifier, segmenter,
//! alteration guard, citation cleanup and raw-HTML mining.

pub mod classify;
pub mod cleanup;
mod error;
pub mod guard;
pub mod mining;
pub mod sanitize;
pub mod segment;

pub use error::ParseError;

pub use classify::{LineClass, classify_line};
pub use cleanup::{normalize_external_article, strip_citations};
pub use mining::mine_articles;
pub use sanitize::{normalize_layout, sanitize_html, sanitize_markdown, sanitize_source};
pub use segment::{Phase, Segmenter, absorb_outliers, segment};

/// Sanitize whichever representation the source offers, requiring at least
/// `min_chars` characters of text.
pub fn extract_text(
    html: Option<&str>,
    markdown: Option<&str>,
    min_chars: usize,
) -> Result<String, ParseError> {
    let text = sanitize_source(html, markdown).ok_or(ParseError::NoSource)?;
    let chars = text.chars().count();
    if chars < min_chars {
        return Err(ParseError::TooShort {
            chars,
            min: min_chars,
        });
    }
    Ok(text)
}
