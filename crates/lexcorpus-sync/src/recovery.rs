//! Gap-recovery orchestrator.
//!
//! Escalates through recovery methods until the article sequence has no gaps
//! or the methods run out. Each method only produces candidate records; a
//! pure merge keeps the ones that fill a current gap, and the sequence is
//! analyzed again from scratch after every method.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use lexcorpus_ai::{TextService, complete_gaps};
use lexcorpus_core::{
    ArticleNumber, ArticleRecord, PipelineConfig, RecoveryPolicy, SequenceAnalysis, analyze,
    sort_records,
};
use lexcorpus_parse::mining::MIN_BODY_CHARS;
use lexcorpus_parse::{mine_articles, normalize_external_article, sanitize_source, segment};

use crate::fetch::{CorpusLookup, CorpusStatute, FetchOptions, FetchedPage, PageFetcher};
use crate::progress::Progress;

/// The recovery methods, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMethod {
    /// Primary fetch, sanitize, segment, repair.
    Baseline,
    FullPageRefetch,
    RawHtmlMining,
    AiCompletion,
    AlternateCorpus,
    /// Two more fetches with different rendering, merged.
    DualRefetch,
}

impl RecoveryMethod {
    pub fn index(&self) -> u8 {
        match self {
            Self::Baseline => 1,
            Self::FullPageRefetch => 2,
            Self::RawHtmlMining => 3,
            Self::AiCompletion => 4,
            Self::AlternateCorpus => 5,
            Self::DualRefetch => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::FullPageRefetch => "full-page re-fetch",
            Self::RawHtmlMining => "raw HTML mining",
            Self::AiCompletion => "AI gap completion",
            Self::AlternateCorpus => "alternate corpus",
            Self::DualRefetch => "dual re-fetch merge",
        }
    }
}

impl fmt::Display for RecoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method {} ({})", self.index(), self.label())
    }
}

/// Methods 2 to 6.
pub const ESCALATION: [RecoveryMethod; 5] = [
    RecoveryMethod::FullPageRefetch,
    RecoveryMethod::RawHtmlMining,
    RecoveryMethod::AiCompletion,
    RecoveryMethod::AlternateCorpus,
    RecoveryMethod::DualRefetch,
];

/// Methods to try after the baseline, given the initial missing count.
pub fn plan(initial_missing: u32, policy: &RecoveryPolicy) -> Vec<RecoveryMethod> {
    if initial_missing == 0 {
        Vec::new()
    } else if initial_missing <= policy.ai_only_threshold {
        vec![RecoveryMethod::AiCompletion]
    } else {
        ESCALATION.to_vec()
    }
}

/// Why `method` is not worth running with `remaining` gaps, if it isn't.
pub fn skip_reason(
    method: RecoveryMethod,
    remaining: u32,
    policy: &RecoveryPolicy,
) -> Option<&'static str> {
    match method {
        RecoveryMethod::AlternateCorpus if remaining <= policy.corpus_skip_at => {
            Some("too few gaps left for a corpus lookup")
        }
        RecoveryMethod::DualRefetch if remaining <= policy.dual_fetch_skip_at => {
            Some("too few gaps left for two more fetches")
        }
        _ => None,
    }
}

/// What one method did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryStep {
    pub method: RecoveryMethod,
    pub added: usize,
    /// Missing articles after the method ran.
    pub remaining: u32,
    pub skipped: bool,
}

/// Log of a recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryRun {
    pub steps: Vec<RecoveryStep>,
    /// Sources consulted, in order, without repeats.
    pub sources: Vec<String>,
}

impl RecoveryRun {
    fn record_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    pub fn total_added(&self) -> usize {
        self.steps.iter().map(|s| s.added).sum()
    }

    /// Methods that actually ran, baseline included.
    pub fn methods_run(&self) -> Vec<RecoveryMethod> {
        self.steps.iter().filter(|s| !s.skipped).map(|s| s.method).collect()
    }
}

/// Merge `candidates` into `records`, keeping only unsuffixed articles whose
/// base number is missing in `analysis` and not already present. The first
/// candidate for a number wins.
pub fn merge_recovered(
    mut records: Vec<ArticleRecord>,
    candidates: Vec<ArticleRecord>,
    analysis: &SequenceAnalysis,
) -> (Vec<ArticleRecord>, usize) {
    let missing: BTreeSet<u32> = analysis.missing_numbers().into_iter().collect();
    let mut present: BTreeSet<u32> = records
        .iter()
        .filter(|r| r.is_article())
        .filter_map(ArticleRecord::base_number)
        .collect();

    let mut added = 0;
    for candidate in candidates {
        let Some(n) = candidate.article_number() else {
            continue;
        };
        if !candidate.is_article()
            || n.suffix.is_some()
            || !missing.contains(&n.base)
            || !present.insert(n.base)
        {
            continue;
        }
        records.push(candidate);
        added += 1;
    }
    sort_records(&mut records);
    (records, added)
}

/// Article records from an alternate-corpus answer.
pub fn corpus_records(statute: &CorpusStatute) -> Vec<ArticleRecord> {
    statute
        .articles
        .iter()
        .filter_map(|a| {
            let n = ArticleNumber::parse(&a.number)?;
            let record = ArticleRecord::article(&n, "");
            let text = normalize_external_article(&n, &a.text);
            (text.chars().count() >= record.text.chars().count() + MIN_BODY_CHARS)
                .then_some(ArticleRecord { text, ..record })
        })
        .collect()
}

fn segment_page(page: &FetchedPage, config: &PipelineConfig) -> Vec<ArticleRecord> {
    sanitize_source(page.html.as_deref(), page.markdown.as_deref())
        .map(|text| segment(&text, &config.guard))
        .unwrap_or_default()
}

/// Collaborators the orchestrator may call.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub service: Option<&'a dyn TextService>,
    pub corpus: Option<&'a dyn CorpusLookup>,
    pub progress: &'a Progress,
}

/// Record set and analysis as recovery proceeds.
#[derive(Debug, Clone)]
pub struct RecoveryState {
    pub records: Vec<ArticleRecord>,
    pub analysis: SequenceAnalysis,
    /// Raw page text used as the AI source window.
    pub raw_source: String,
    pub run: RecoveryRun,
}

/// Runs the recovery methods for one statute URL.
pub struct Orchestrator<'a> {
    with: Collaborators<'a>,
    config: &'a PipelineConfig,
    url: &'a str,
    statute: Option<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(with: Collaborators<'a>, config: &'a PipelineConfig, url: &'a str) -> Self {
        Self {
            with,
            config,
            url,
            statute: None,
        }
    }

    /// Name used for the AI prompt and the corpus lookup.
    pub fn with_statute_name(mut self, name: Option<String>) -> Self {
        self.statute = name;
        self
    }

    /// Escalate until no gaps remain or every planned method has run.
    pub async fn run(
        &self,
        records: Vec<ArticleRecord>,
        analysis: SequenceAnalysis,
        raw_source: String,
    ) -> RecoveryState {
        let mut state = RecoveryState {
            run: RecoveryRun::default(),
            records,
            analysis,
            raw_source,
        };
        state.run.record_source(format!("{} (main content)", self.url));
        state.run.steps.push(RecoveryStep {
            method: RecoveryMethod::Baseline,
            added: 0,
            remaining: state.analysis.missing_count(),
            skipped: false,
        });

        let plan = plan(state.analysis.missing_count(), &self.config.recovery);
        if plan == [RecoveryMethod::AiCompletion] {
            self.with.progress.emit(format!(
                "Only {} articles missing; going straight to AI completion",
                state.analysis.missing_count()
            ));
        }

        for method in plan {
            if state.analysis.is_complete() {
                break;
            }
            let remaining = state.analysis.missing_count();
            if let Some(why) = self.unavailable(method, remaining) {
                self.with.progress.emit(format!("Skipping {method}: {why}"));
                state.run.steps.push(RecoveryStep {
                    method,
                    added: 0,
                    remaining,
                    skipped: true,
                });
                continue;
            }

            self.with
                .progress
                .emit(format!("{method}: looking for {remaining} missing articles"));
            let candidates = self.candidates(method, &mut state).await;
            debug!(%method, candidates = candidates.len(), "recovery candidates");

            let (records, added) =
                merge_recovered(std::mem::take(&mut state.records), candidates, &state.analysis);
            state.records = records;
            state.analysis = analyze(&state.records, &self.config.outlier);
            let remaining = state.analysis.missing_count();
            state.run.steps.push(RecoveryStep {
                method,
                added,
                remaining,
                skipped: false,
            });
            self.with
                .progress
                .emit(format!("{method}: +{added} articles, {remaining} still missing"));
        }
        state
    }

    fn unavailable(&self, method: RecoveryMethod, remaining: u32) -> Option<&'static str> {
        match method {
            RecoveryMethod::AiCompletion if self.with.service.is_none() => {
                Some("no AI service configured")
            }
            RecoveryMethod::AlternateCorpus if self.with.corpus.is_none() => {
                Some("no corpus service configured")
            }
            RecoveryMethod::AlternateCorpus if self.statute.is_none() => {
                Some("statute name unknown")
            }
            _ => skip_reason(method, remaining, &self.config.recovery),
        }
    }

    async fn candidates(
        &self,
        method: RecoveryMethod,
        state: &mut RecoveryState,
    ) -> Vec<ArticleRecord> {
        let policy = &self.config.recovery;
        let fetcher = self.with.fetcher;
        let url = self.url;
        let missing = state.analysis.missing_numbers();

        match method {
            RecoveryMethod::Baseline => Vec::new(),
            RecoveryMethod::FullPageRefetch => {
                let page = fetcher
                    .fetch(url, &FetchOptions::full_page(policy.full_page_wait_ms))
                    .await;
                state.run.record_source(format!("{url} (full page)"));
                segment_page(&page, self.config)
            }
            RecoveryMethod::RawHtmlMining => {
                let page = fetcher
                    .fetch(url, &FetchOptions::raw_html(policy.full_page_wait_ms))
                    .await;
                let combined = page.combined();
                if !combined.is_empty() {
                    state.run.record_source(format!("{url} (raw html)"));
                    state.raw_source = combined;
                }
                mine_articles(&state.raw_source, &missing)
            }
            RecoveryMethod::AiCompletion => {
                let Some(service) = self.with.service else {
                    return Vec::new();
                };
                state.run.record_source(format!("ai:{}", service.model()));
                complete_gaps(
                    service,
                    self.statute.as_deref(),
                    &missing,
                    &state.raw_source,
                    policy.max_ai_gap_numbers,
                    policy.source_window_chars,
                )
                .await
                .records
            }
            RecoveryMethod::AlternateCorpus => {
                let (Some(corpus), Some(name)) = (self.with.corpus, self.statute.as_deref()) else {
                    return Vec::new();
                };
                state.run.record_source(format!("corpus:{name}"));
                corpus
                    .lookup(name)
                    .await
                    .map(|s| corpus_records(&s))
                    .unwrap_or_default()
            }
            RecoveryMethod::DualRefetch => {
                let clean = fetcher
                    .fetch(url, &FetchOptions::main_content(policy.render_wait_ms))
                    .await;
                let raw = fetcher
                    .fetch(url, &FetchOptions::raw_html(policy.full_page_wait_ms))
                    .await;
                state.run.record_source(format!("{url} (dual fetch)"));
                let mut out = segment_page(&clean, self.config);
                out.extend(segment_page(&raw, self.config));
                out.extend(mine_articles(&raw.combined(), &missing));
                out
            }
        }
    }
}
