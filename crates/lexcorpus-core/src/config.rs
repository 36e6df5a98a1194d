//! Pipeline policy: every heuristic threshold in one deserialisable place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse pipeline config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pipeline config: {0}")]
    Invalid(String),
}

/// Tail-outlier detection used by the sequence analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    /// Final gap larger than `ratio` times the preceding gap marks an outlier.
    pub ratio: f64,
    /// Final gap larger than this marks an outlier regardless of ratio.
    pub absolute_gap: u32,
    /// Largest step accepted as locally consistent when walking back.
    pub max_local_step: u32,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            ratio: 10.0,
            absolute_gap: 50,
            max_local_step: 20,
        }
    }
}

/// Alteration-block guard applied while segmenting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardPolicy {
    /// How many recently accepted article numbers form the local window.
    pub window: usize,
    /// Minimum jump above the local maximum treated as a foreign reference.
    pub min_jump: u32,
    /// Jump threshold as a multiple of the recent step size.
    pub step_multiplier: u32,
    /// Lines after an amendment introduction before quoting is forced off.
    pub max_quoted_lines: usize,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            window: 5,
            min_jump: 30,
            step_multiplier: 10,
            max_quoted_lines: 40,
        }
    }
}

/// Per-article AI validation and repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    /// Flagged articles sent per AI request.
    pub batch_size: usize,
    /// Repaired text shorter than this fraction of the original is rejected.
    pub min_length_ratio: f64,
    /// Articles shorter than this are not flagged for missing final punctuation.
    pub min_flag_length: usize,
    /// Characters of source text sent alongside flagged articles.
    pub source_window_chars: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            batch_size: 20,
            min_length_ratio: 0.85,
            min_flag_length: 60,
            source_window_chars: 30_000,
        }
    }
}

/// Gap-recovery cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryPolicy {
    /// Initial missing count at or below which only AI completion runs.
    pub ai_only_threshold: u32,
    /// Alternate-corpus lookup is skipped once missing count is at or below this.
    pub corpus_skip_at: u32,
    /// Dual re-fetch is skipped once missing count is at or below this.
    pub dual_fetch_skip_at: u32,
    /// Most missing numbers sent in one AI completion request.
    pub max_ai_gap_numbers: usize,
    /// Characters of raw source text sent to the AI completion and explainer.
    pub source_window_chars: usize,
    /// Render wait for the primary fetch.
    pub render_wait_ms: u64,
    /// Render wait for full-page re-fetches.
    pub full_page_wait_ms: u64,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            ai_only_threshold: 5,
            corpus_skip_at: 3,
            dual_fetch_skip_at: 5,
            max_ai_gap_numbers: 50,
            source_window_chars: 60_000,
            render_wait_ms: 3_000,
            full_page_wait_ms: 8_000,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub outlier: OutlierPolicy,
    pub guard: GuardPolicy,
    pub repair: RepairPolicy,
    pub recovery: RecoveryPolicy,
    /// Sanitized text shorter than this aborts the run.
    pub min_source_chars: usize,
    /// Records per storage insert.
    pub store_batch_size: usize,
    /// Run the whole-text AI cleanup pass before segmenting.
    pub ai_cleanup: bool,
    /// Texts longer than this skip the whole-text cleanup pass.
    pub cleanup_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outlier: OutlierPolicy::default(),
            guard: GuardPolicy::default(),
            repair: RepairPolicy::default(),
            recovery: RecoveryPolicy::default(),
            min_source_chars: 200,
            store_batch_size: 20,
            ai_cleanup: true,
            cleanup_max_chars: 120_000,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_batch_size == 0 {
            return Err(ConfigError::Invalid("store_batch_size must be > 0".into()));
        }
        if self.repair.batch_size == 0 {
            return Err(ConfigError::Invalid("repair.batch_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.repair.min_length_ratio) {
            return Err(ConfigError::Invalid(
                "repair.min_length_ratio must be within 0..=1".into(),
            ));
        }
        if self.outlier.ratio <= 0.0 {
            return Err(ConfigError::Invalid("outlier.ratio must be positive".into()));
        }
        Ok(())
    }
}
