//! Optional whole-text AI pass that repairs line breaks before segmentation.

use tracing::{info, warn};

use lexcorpus_parse::cleanup::{count_article_openers, count_roman_items};

use crate::json::strip_code_fence;
use crate::prompts::build_cleanup_prompt;
use crate::service::TextService;

/// Minimum share of the input length the cleaned text must keep.
pub const MIN_CLEANUP_RATIO: f64 = 0.9;

/// What happened to a cleanup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupVerdict {
    Applied,
    /// Input larger than the configured ceiling.
    SkippedTooLong,
    /// The service failed; input kept.
    ServiceFailed,
    /// Output lost content; input kept.
    Regressed,
}

/// Ask `service` to fix line breaks in `text`.
///
/// Returns the cleaned text only when it keeps at least
/// [`MIN_CLEANUP_RATIO`] of the length and no fewer article openers or roman
/// enumeration items; otherwise the input comes back unchanged.
pub async fn clean_text(
    service: &dyn TextService,
    text: &str,
    max_chars: usize,
) -> (String, CleanupVerdict) {
    let in_chars = text.chars().count();
    if in_chars > max_chars {
        info!(chars = in_chars, max_chars, "text too long for AI cleanup");
        return (text.to_string(), CleanupVerdict::SkippedTooLong);
    }

    let response = match service.complete(&build_cleanup_prompt(text)).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "AI cleanup failed; using sanitized text");
            return (text.to_string(), CleanupVerdict::ServiceFailed);
        }
    };
    let cleaned: String = strip_code_fence(&response)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let out_chars = cleaned.chars().count();
    let keeps_length = out_chars as f64 >= in_chars as f64 * MIN_CLEANUP_RATIO;
    let keeps_articles = count_article_openers(&cleaned) >= count_article_openers(text);
    let keeps_items = count_roman_items(&cleaned) >= count_roman_items(text);
    if !(keeps_length && keeps_articles && keeps_items) {
        warn!(
            in_chars,
            out_chars, keeps_articles, keeps_items, "discarding AI cleanup that lost content"
        );
        return (text.to_string(), CleanupVerdict::Regressed);
    }
    info!(in_chars, out_chars, "AI cleanup applied");
    (cleaned, CleanupVerdict::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;

    const TEXT: &str = "Art. 1º Compete: I - um; II - dois.\nArt. 2º Fim.";

    #[tokio::test]
    async fn applies_reformatted_text() {
        let svc = ScriptedService::new().on(
            "TEXTO:",
            "Art. 1º Compete:\nI - um;\nII - dois.\nArt. 2º Fim.",
        );
        let (out, verdict) = clean_text(&svc, TEXT, 1000).await;
        assert_eq!(verdict, CleanupVerdict::Applied);
        assert_eq!(out.lines().count(), 4);
    }

    #[tokio::test]
    async fn rejects_output_missing_articles() {
        let svc = ScriptedService::new()
            .on("TEXTO:", "Art. 1º Compete: I - um; II - dois. Fim do texto aqui.");
        let (out, verdict) = clean_text(&svc, TEXT, 1000).await;
        assert_eq!(verdict, CleanupVerdict::Regressed);
        assert_eq!(out, TEXT);
    }

    #[tokio::test]
    async fn rejects_short_output() {
        let svc = ScriptedService::new().on("TEXTO:", "Art. 1º\nArt. 2º");
        let (_, verdict) = clean_text(&svc, TEXT, 1000).await;
        assert_eq!(verdict, CleanupVerdict::Regressed);
    }

    #[tokio::test]
    async fn skips_long_text_and_failures() {
        let svc = ScriptedService::new();
        assert_eq!(clean_text(&svc, TEXT, 10).await.1, CleanupVerdict::SkippedTooLong);
        assert_eq!(clean_text(&svc, TEXT, 1000).await.1, CleanupVerdict::ServiceFailed);
        assert_eq!(svc.calls().len(), 1);
    }
}
