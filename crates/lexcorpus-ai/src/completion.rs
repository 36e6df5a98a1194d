//! AI gap completion: ask the service for specific missing articles.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use lexcorpus_core::{ArticleNumber, ArticleRecord, sort_records};
use lexcorpus_parse::classify::strip_article_opener;
use lexcorpus_parse::cleanup::{head_window, normalize_external_article};

use crate::json::parse_lenient;
use crate::prompts::build_completion_prompt;
use crate::repair::number_from_json;
use crate::service::TextService;

/// Shortest article body accepted for a normal-status answer.
pub const MIN_COMPLETION_BODY: usize = 10;

/// Status the service attaches to a found article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Normal,
    Repealed,
    Vetoed,
}

impl CompletionStatus {
    fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "revogado" | "revogada" | "repealed" => Self::Repealed,
            "vetado" | "vetada" | "vetoed" => Self::Vetoed,
            _ => Self::Normal,
        }
    }

    fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Repealed => Some("(Revogado)"),
            Self::Vetoed => Some("(VETADO)"),
        }
    }
}

/// Result of one completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub records: Vec<ArticleRecord>,
    /// Numbers the service reported as absent from the source.
    pub not_found: Vec<u32>,
    /// Numbers that were asked for in this request (after capping).
    pub requested: Vec<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    found: BTreeMap<String, Value>,
    #[serde(default)]
    not_found: Vec<Value>,
}

/// Ask `service` for the articles in `missing`, at most `max_numbers` of them.
///
/// Only numbers that were requested are accepted. A normal-status answer
/// needs at least [`MIN_COMPLETION_BODY`] characters of body; repealed and
/// vetoed answers without text become marker records.
pub async fn complete_gaps(
    service: &dyn TextService,
    title: Option<&str>,
    missing: &[u32],
    source: &str,
    max_numbers: usize,
    window_chars: usize,
) -> Completion {
    let requested: Vec<u32> = missing.iter().copied().take(max_numbers).collect();
    let mut out = Completion {
        requested: requested.clone(),
        ..Completion::default()
    };
    if requested.is_empty() {
        return out;
    }
    let wanted: BTreeSet<u32> = requested.iter().copied().collect();

    let prompt = build_completion_prompt(title, &requested, head_window(source, window_chars));
    let response = match service.complete(&prompt).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "AI gap completion failed");
            return out;
        }
    };
    let Some(parsed) = parse_lenient::<CompletionResponse>(&response) else {
        warn!("AI gap completion returned malformed JSON");
        return out;
    };

    let mut seen = BTreeSet::new();
    for (key, entry) in parsed.found {
        let Some(number) = ArticleNumber::parse(&key) else {
            continue;
        };
        if number.suffix.is_some() || !wanted.contains(&number.base) || !seen.insert(number.base) {
            continue;
        }
        let (text, status) = match &entry {
            Value::String(s) => (s.clone(), CompletionStatus::Normal),
            Value::Object(map) => (
                map.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
                map.get("status")
                    .and_then(Value::as_str)
                    .map(CompletionStatus::from_label)
                    .unwrap_or(CompletionStatus::Normal),
            ),
            _ => continue,
        };
        if let Some(record) = build_record(&number, &text, status) {
            out.records.push(record);
        }
    }
    sort_records(&mut out.records);
    out.not_found = parsed
        .not_found
        .iter()
        .filter_map(number_from_json)
        .map(|n| n.base)
        .filter(|b| wanted.contains(b) && !seen.contains(b))
        .collect();
    out.not_found.sort_unstable();
    out.not_found.dedup();

    info!(
        requested = requested.len(),
        found = out.records.len(),
        not_found = out.not_found.len(),
        "AI gap completion"
    );
    out
}

fn build_record(
    number: &ArticleNumber,
    text: &str,
    status: CompletionStatus,
) -> Option<ArticleRecord> {
    let full = normalize_external_article(number, text);
    let body_len = strip_article_opener(&full)
        .map(|b| b.trim_start_matches(['.', ' ']).chars().count())
        .unwrap_or(0);
    if body_len >= MIN_COMPLETION_BODY {
        return Some(ArticleRecord {
            text: full,
            ..ArticleRecord::article(number, "")
        });
    }
    status
        .marker()
        .map(|marker| ArticleRecord::article(number, marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;

    const NEEDLE: &str = "ARTIGOS AUSENTES";

    #[tokio::test]
    async fn accepts_only_requested_numbers() {
        let svc = ScriptedService::new().on(
            NEEDLE,
            r#"{"found":{"4":{"text":"Art. 4º O texto recuperado do artigo quarto.","status":"normal"},
                          "5":{"text":"Art. 5º Não foi pedido mas veio.","status":"normal"},
                          "6":{"text":"","status":"vetado"}},
                "not_found":[7, "8", 99]}"#,
        );
        let c = complete_gaps(&svc, Some("LEI Nº 1"), &[4, 6, 7], "fonte", 50, 1000).await;
        let nums: Vec<_> = c.records.iter().filter_map(|r| r.number.as_deref()).collect();
        assert_eq!(nums, vec!["4º", "6º"]);
        assert_eq!(c.records[0].text, "Art. 4º O texto recuperado do artigo quarto.");
        assert_eq!(c.records[1].text, "Art. 6º (VETADO)");
        assert_eq!(c.not_found, vec![7]);
    }

    #[tokio::test]
    async fn short_normal_text_is_rejected() {
        let svc = ScriptedService::new()
            .on(NEEDLE, r#"{"found":{"4":"Art. 4º Curto."},"not_found":[]}"#);
        let c = complete_gaps(&svc, None, &[4], "", 50, 1000).await;
        assert!(c.records.is_empty());
    }

    #[tokio::test]
    async fn request_is_capped() {
        let svc = ScriptedService::new().on(NEEDLE, r#"{"found":{},"not_found":[]}"#);
        let missing: Vec<u32> = (1..=80).collect();
        let c = complete_gaps(&svc, None, &missing, "", 50, 1000).await;
        assert_eq!(c.requested.len(), 50);
        assert!(svc.calls()[0].contains(", 50\n"));
        assert!(!svc.calls()[0].contains(", 51"));
    }

    #[tokio::test]
    async fn malformed_or_failed_response_yields_nothing() {
        let svc = ScriptedService::new().on(NEEDLE, "não encontrei nada");
        let c = complete_gaps(&svc, None, &[4], "", 50, 1000).await;
        assert!(c.records.is_empty() && c.not_found.is_empty());

        let svc = ScriptedService::new();
        let c = complete_gaps(&svc, None, &[4], "", 50, 1000).await;
        assert!(c.records.is_empty());
    }
}
