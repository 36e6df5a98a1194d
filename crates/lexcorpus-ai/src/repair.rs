//! Per-article validation and AI repair with an anti-regression gate.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use lexcorpus_core::{ArticleNumber, ArticleRecord, RepairPolicy};
use lexcorpus_parse::cleanup::{
    count_article_openers, count_roman_items, has_residual_citation, head_window, is_veto_line,
    normalize_external_article,
};

use crate::json::parse_lenient;
use crate::prompts::build_repair_prompt;
use crate::service::TextService;

const INCOMPLETE_MARKERS: &[&str] = &[
    "[texto incompleto]",
    "(texto incompleto)",
    "[incompleto]",
    "[...]",
    "(...)",
];
const CLOSING_PUNCTUATION: &[char] = &['.', ';', ':', '!', '?', ')', '”', '"'];

static EMPTY_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[IVXLC]+\s*[-–—]|[a-z]\))\s*$").unwrap());

/// Defect detected in an article record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairFlag {
    IncompleteMarker,
    /// Long text that does not end in closing punctuation.
    Truncated,
    /// `(VETADO)` alone on a line after the opener.
    DetachedVeto,
    ResidualCitation,
    /// Enumeration item with no text after its marker.
    EmptyEnumeration,
}

impl RepairFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncompleteMarker => "incomplete_marker",
            Self::Truncated => "truncated",
            Self::DetachedVeto => "detached_veto",
            Self::ResidualCitation => "residual_citation",
            Self::EmptyEnumeration => "empty_enumeration",
        }
    }
}

/// Flags raised by one article's text.
pub fn scan_article(text: &str, policy: &RepairPolicy) -> Vec<RepairFlag> {
    let mut flags = Vec::new();
    let trimmed = text.trim_end();
    let lower = trimmed.to_lowercase();
    if INCOMPLETE_MARKERS.iter().any(|m| lower.contains(m))
        || trimmed.ends_with("...")
        || trimmed.ends_with('…')
    {
        flags.push(RepairFlag::IncompleteMarker);
    } else if trimmed.chars().count() >= policy.min_flag_length
        && !trimmed.ends_with(CLOSING_PUNCTUATION)
    {
        flags.push(RepairFlag::Truncated);
    }
    if trimmed.lines().skip(1).any(is_veto_line) {
        flags.push(RepairFlag::DetachedVeto);
    }
    if has_residual_citation(trimmed) {
        flags.push(RepairFlag::ResidualCitation);
    }
    if trimmed.lines().any(|l| EMPTY_ITEM_RE.is_match(l.trim())) {
        flags.push(RepairFlag::EmptyEnumeration);
    }
    flags
}

/// Whether `candidate` keeps at least as much content as `original`.
///
/// Rejects output shorter than `min_length_ratio` of the original or with
/// fewer article openers or roman enumeration items.
pub fn passes_regression_check(original: &str, candidate: &str, min_length_ratio: f64) -> bool {
    let orig_len = original.chars().count() as f64;
    let cand_len = candidate.chars().count() as f64;
    cand_len >= orig_len * min_length_ratio
        && count_article_openers(candidate) >= count_article_openers(original)
        && count_roman_items(candidate) >= count_roman_items(original)
}

/// Summary of one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub flagged: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub repaired: usize,
    /// AI answers discarded by the regression check.
    pub rejected: usize,
    /// `(number, note)` for each accepted repair.
    pub notes: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct RepairResponse {
    #[serde(default)]
    articles: Vec<RepairedArticle>,
}

#[derive(Deserialize)]
struct RepairedArticle {
    number: Value,
    #[serde(default)]
    text: String,
    #[serde(default)]
    note: Option<String>,
}

/// Parse an article number that may arrive as a JSON string or integer.
pub(crate) fn number_from_json(v: &Value) -> Option<ArticleNumber> {
    match v {
        Value::String(s) => ArticleNumber::parse(s),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(ArticleNumber::new),
        _ => None,
    }
}

/// Scan every article and ask `service` to repair the flagged ones.
///
/// Service failures and malformed answers leave the affected batch
/// untouched; they never fail the pass.
pub async fn repair_articles(
    service: &dyn TextService,
    records: &mut [ArticleRecord],
    source: &str,
    policy: &RepairPolicy,
) -> RepairReport {
    let mut report = RepairReport::default();
    let flagged: Vec<(usize, Vec<RepairFlag>)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_article())
        .map(|(i, r)| (i, scan_article(&r.text, policy)))
        .filter(|(_, flags)| !flags.is_empty())
        .collect();
    report.flagged = flagged.len();
    if flagged.is_empty() {
        return report;
    }
    info!(flagged = flagged.len(), "articles flagged for repair");

    let window = head_window(source, policy.source_window_chars);
    for batch in flagged.chunks(policy.batch_size.max(1)) {
        report.batches += 1;
        let items: Vec<(String, String, Vec<&'static str>)> = batch
            .iter()
            .map(|(i, flags)| {
                let r = &records[*i];
                (
                    r.number.clone().unwrap_or_default(),
                    r.text.clone(),
                    flags.iter().map(RepairFlag::as_str).collect(),
                )
            })
            .collect();

        let response = match service.complete(&build_repair_prompt(&items, window)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "repair batch failed; keeping original text");
                report.failed_batches += 1;
                continue;
            }
        };
        let Some(parsed) = parse_lenient::<RepairResponse>(&response) else {
            warn!("repair response was not the expected JSON; keeping original text");
            report.failed_batches += 1;
            continue;
        };

        for answer in parsed.articles {
            let Some(number) = number_from_json(&answer.number) else {
                continue;
            };
            let canonical = number.canonical();
            let Some((idx, _)) = batch
                .iter()
                .find(|(i, _)| records[*i].number.as_deref() == Some(canonical.as_str()))
            else {
                debug!(number = %canonical, "ignoring repair for an unrequested article");
                continue;
            };
            let candidate = normalize_external_article(&number, &answer.text);
            let original = &records[*idx].text;
            if candidate == *original {
                continue;
            }
            if !passes_regression_check(original, &candidate, policy.min_length_ratio) {
                warn!(
                    number = %canonical,
                    original_chars = original.chars().count(),
                    repaired_chars = candidate.chars().count(),
                    "discarding AI repair that lost content"
                );
                report.rejected += 1;
                continue;
            }
            records[*idx].text = candidate;
            report.repaired += 1;
            if let Some(note) = answer.note.filter(|n| !n.trim().is_empty()) {
                report.notes.push((canonical, note));
            }
        }
    }
    info!(
        repaired = report.repaired,
        rejected = report.rejected,
        failed_batches = report.failed_batches,
        "repair pass complete"
    );
    report
}
