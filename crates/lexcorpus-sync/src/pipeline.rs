//! End-to-end ingestion of one statute URL.
//!
//! Fetch, sanitize, optional AI cleanup, segment, analyze, repair, recover,
//! explain, persist. Every stage finishes before the next starts. Only a
//! source with no usable text fails the run; every other stage degrades to
//! its input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use lexcorpus_ai::{
    CleanupVerdict, RepairReport, TextService, clean_text, explain_gaps, repair_articles,
};
use lexcorpus_core::{ArticleRecord, PipelineConfig, RecordKind, SequenceAnalysis, analyze};
use lexcorpus_parse::{ParseError, absorb_outliers, extract_text, segment};
use lexcorpus_store::{ArticleSink, StoreError, WriteReport, validate_destination, write_in_batches};

use crate::fetch::{CorpusLookup, FetchOptions, PageFetcher};
use crate::progress::Progress;
use crate::recovery::{Collaborators, Orchestrator, RecoveryRun};

/// How far a run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Sanitize, segment and analyze only.
    RawPreview,
    /// Everything except persistence.
    AnalyzedPreview,
    #[default]
    Full,
}

impl RunMode {
    pub fn uses_ai(&self) -> bool {
        !matches!(self, Self::RawPreview)
    }

    pub fn persists(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// One statute to ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    /// Storage destination (table name).
    pub destination: String,
    pub url: String,
    pub mode: RunMode,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("insufficient source content: {0}")]
    InsufficientSource(#[from] ParseError),
    #[error(transparent)]
    Destination(#[from] StoreError),
    #[error("full run requested without a storage collaborator")]
    NoSink,
}

/// Structured result of a run. Always returned, even on failure.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub success: bool,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub records: Vec<ArticleRecord>,
    pub analysis: SequenceAnalysis,
    /// Overall gap narrative from the explainer.
    pub summary: Option<String>,
    pub cleanup: Option<CleanupVerdict>,
    pub repair: Option<RepairReport>,
    pub recovery: Option<RecoveryRun>,
    pub write: Option<WriteReport>,
    pub error: Option<String>,
}

impl IngestOutcome {
    fn new(mode: RunMode, started_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            mode,
            started_at,
            records: Vec::new(),
            analysis: SequenceAnalysis::default(),
            summary: None,
            cleanup: None,
            repair: None,
            recovery: None,
            write: None,
            error: None,
        }
    }

    pub fn article_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_article()).count()
    }

    /// Text of the title record, if one was found.
    pub fn title(&self) -> Option<&str> {
        statute_title(&self.records)
    }
}

fn statute_title(records: &[ArticleRecord]) -> Option<&str> {
    records
        .iter()
        .find(|r| r.kind == RecordKind::Title)
        .map(|r| r.text.as_str())
}

/// Segment `text`, analyze it, and fold analyzer outliers back into the
/// preceding articles.
pub fn segment_and_analyze(
    text: &str,
    config: &PipelineConfig,
) -> (Vec<ArticleRecord>, SequenceAnalysis) {
    let records = segment(text, &config.guard);
    let analysis = analyze(&records, &config.outlier);
    if analysis.discarded.is_empty() {
        return (records, analysis);
    }
    let discarded = analysis.discarded.clone();
    let records = absorb_outliers(records, &discarded);
    let analysis = SequenceAnalysis {
        discarded,
        ..analyze(&records, &config.outlier)
    };
    (records, analysis)
}

/// Ingestion pipeline wired to its collaborators.
pub struct Pipeline<'a> {
    fetcher: &'a dyn PageFetcher,
    service: Option<&'a dyn TextService>,
    corpus: Option<&'a dyn CorpusLookup>,
    sink: Option<&'a dyn ArticleSink>,
    config: PipelineConfig,
    progress: Progress,
}

impl<'a> Pipeline<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            service: None,
            corpus: None,
            sink: None,
            config,
            progress: Progress::silent(),
        }
    }

    pub fn with_ai(mut self, service: &'a dyn TextService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_corpus(mut self, corpus: &'a dyn CorpusLookup) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn ArticleSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Run one ingestion to completion.
    pub async fn run(&self, request: &IngestRequest) -> IngestOutcome {
        let started_at = Utc::now();
        let mut outcome = IngestOutcome::new(request.mode, started_at);
        if let Err(e) = self.ingest(request, &mut outcome).await {
            warn!(url = %request.url, error = %e, "ingestion failed");
            self.progress.emit(format!("Ingestion failed: {e}"));
            outcome.success = false;
            outcome.error = Some(e.to_string());
        }
        outcome
    }

    async fn ingest(
        &self,
        request: &IngestRequest,
        outcome: &mut IngestOutcome,
    ) -> Result<(), IngestError> {
        let config = &self.config;
        let mode = request.mode;
        let url = request.url.as_str();
        if mode.persists() {
            validate_destination(&request.destination)?;
            if self.sink.is_none() {
                return Err(IngestError::NoSink);
            }
        }

        // ── Fetch and sanitize ──

        self.progress.emit(format!("Fetching {url}"));
        let page = self
            .fetcher
            .fetch(url, &FetchOptions::main_content(config.recovery.render_wait_ms))
            .await;
        let mut text = extract_text(
            page.html.as_deref(),
            page.markdown.as_deref(),
            config.min_source_chars,
        )?;
        self.progress
            .emit(format!("Sanitized text: {} characters", text.chars().count()));

        let service = if mode.uses_ai() { self.service } else { None };
        if let Some(service) = service
            && config.ai_cleanup
        {
            let (cleaned, verdict) = clean_text(service, &text, config.cleanup_max_chars).await;
            self.progress.emit(format!("AI cleanup: {verdict:?}"));
            text = cleaned;
            outcome.cleanup = Some(verdict);
        }

        // ── Segment and analyze ──

        let (mut records, mut analysis) = segment_and_analyze(&text, config);
        self.progress.emit(format!(
            "Segmented {} records ({} articles); {} of {} expected articles found",
            records.len(),
            records.iter().filter(|r| r.is_article()).count(),
            analysis.found_count,
            analysis.expected_count,
        ));
        if !analysis.discarded.is_empty() {
            self.progress.emit(format!(
                "Discarded outlier article numbers {:?}",
                analysis.discarded
            ));
        }

        if mode == RunMode::RawPreview {
            outcome.records = records;
            outcome.analysis = analysis;
            outcome.success = true;
            return Ok(());
        }

        // ── Repair ──

        if let Some(service) = service {
            let report = repair_articles(service, &mut records, &text, &config.repair).await;
            if report.flagged > 0 {
                self.progress.emit(format!(
                    "Repair: {} flagged, {} repaired, {} rejected",
                    report.flagged, report.repaired, report.rejected
                ));
            }
            outcome.repair = Some(report);
        }

        // ── Recover ──

        let title = statute_title(&records).map(str::to_string);
        let mut source = page.combined();
        if !analysis.is_complete() {
            self.progress.emit(format!(
                "{} articles missing in {} gaps; starting recovery",
                analysis.missing_count(),
                analysis.gaps.len()
            ));
            let with = Collaborators {
                fetcher: self.fetcher,
                service,
                corpus: self.corpus,
                progress: &self.progress,
            };
            let state = Orchestrator::new(with, config, url)
                .with_statute_name(title.clone())
                .run(records, analysis, source)
                .await;
            records = state.records;
            analysis = state.analysis;
            source = state.raw_source;
            outcome.recovery = Some(state.run);
        }

        // ── Explain ──

        if !analysis.is_complete()
            && let Some(service) = service
        {
            let explanation = explain_gaps(
                service,
                title.as_deref(),
                &analysis.gaps,
                &source,
                config.recovery.source_window_chars,
            )
            .await;
            analysis.gaps = explanation.gaps;
            outcome.summary = explanation.summary;
        }

        outcome.records = records;
        outcome.analysis = analysis;

        // ── Persist ──

        if let (true, Some(sink)) = (mode.persists(), self.sink) {
            self.progress.emit(format!(
                "Writing {} records to {}",
                outcome.records.len(),
                request.destination
            ));
            let report = write_in_batches(
                sink,
                &request.destination,
                url,
                &outcome.records,
                config.store_batch_size,
            )
            .await;
            outcome.success = report.any_written();
            if report.failed_batches > 0 {
                self.progress.emit(format!(
                    "{} of {} batches failed",
                    report.failed_batches, report.batches
                ));
            }
            outcome.write = Some(report);
        } else {
            outcome.success = true;
        }

        info!(
            url,
            success = outcome.success,
            records = outcome.records.len(),
            missing = outcome.analysis.missing_count(),
            "ingestion finished"
        );
        self.progress.emit(format!(
            "Done: {} records, {} articles, {} missing",
            outcome.records.len(),
            outcome.article_count(),
            outcome.analysis.missing_count()
        ));
        Ok(())
    }
}
