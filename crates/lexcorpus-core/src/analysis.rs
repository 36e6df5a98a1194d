//! Sequence analysis: expected article range, found count, and gap intervals.
//!
//! The analysis is always recomputed from a full record set; nothing in here
//! patches a previous result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OutlierPolicy;
use crate::numbering::ArticleNumber;
use crate::record::ArticleRecord;

/// Most likely reason a range of articles is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Repealed,
    Vetoed,
    Unregulated,
    #[default]
    NotFound,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repealed => "repealed",
            Self::Vetoed => "vetoed",
            Self::Unregulated => "unregulated",
            Self::NotFound => "not_found",
        }
    }

    /// Parse a classification label, accepting Portuguese synonyms.
    pub fn from_label(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase().replace([' ', '-'], "_");
        match norm.as_str() {
            "repealed" | "revogado" | "revogados" => Some(Self::Repealed),
            "vetoed" | "vetado" | "vetados" => Some(Self::Vetoed),
            "unregulated" | "nao_regulamentado" | "não_regulamentado" => Some(Self::Unregulated),
            "not_found" | "nao_encontrado" | "não_encontrado" | "unknown" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// A contiguous run of missing article numbers, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapInterval {
    pub from: u32,
    pub to: u32,
    pub count: u32,
    pub kind: GapKind,
    pub reason: Option<String>,
}

impl GapInterval {
    pub fn new(from: u32, to: u32) -> Self {
        Self {
            from,
            to,
            count: to - from + 1,
            kind: GapKind::NotFound,
            reason: None,
        }
    }

    pub fn contains(&self, n: u32) -> bool {
        (self.from..=self.to).contains(&n)
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> {
        self.from..=self.to
    }
}

/// Derived view of an article set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SequenceAnalysis {
    /// Canonical number of the first genuine article.
    pub first_article: Option<String>,
    /// Canonical number of the last genuine article.
    pub last_article: Option<String>,
    /// Base integer of the last genuine article, after outlier correction.
    pub last_number: u32,
    pub expected_count: u32,
    pub found_count: u32,
    pub extraction_ratio: f64,
    pub gaps: Vec<GapInterval>,
    /// Base numbers dropped as tail outliers.
    pub discarded: Vec<u32>,
}

impl SequenceAnalysis {
    /// Total number of missing articles across all gaps.
    pub fn missing_count(&self) -> u32 {
        self.gaps.iter().map(|g| g.count).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Every missing base number, ascending.
    pub fn missing_numbers(&self) -> Vec<u32> {
        self.gaps.iter().flat_map(|g| g.numbers()).collect()
    }
}

/// Analyze the article numbers in `records`.
pub fn analyze(records: &[ArticleRecord], policy: &OutlierPolicy) -> SequenceAnalysis {
    let numbers: Vec<ArticleNumber> = records
        .iter()
        .filter(|r| r.is_article())
        .filter_map(|r| r.article_number())
        .collect();
    let bases: BTreeSet<u32> = numbers.iter().map(|n| n.base).collect();
    analyze_numbers(&bases.into_iter().collect::<Vec<_>>(), &numbers, policy)
}

/// Analyze a sorted, de-duplicated list of base numbers.
///
/// `numbers` supplies canonical forms for the first/last article labels; it
/// may be empty, in which case labels are derived from the bases.
pub fn analyze_numbers(
    sorted: &[u32],
    numbers: &[ArticleNumber],
    policy: &OutlierPolicy,
) -> SequenceAnalysis {
    if sorted.is_empty() {
        return SequenceAnalysis::default();
    }

    let kept = trim_tail_outliers(sorted, policy);
    let discarded: Vec<u32> = sorted[kept.len()..].to_vec();
    if !discarded.is_empty() {
        debug!(?discarded, "dropped tail outliers");
    }

    let first = kept[0];
    let last = kept[kept.len() - 1];
    let expected_count = last - first + 1;
    let found_count = kept.len() as u32;

    let mut gaps = Vec::new();
    if first > 1 {
        gaps.push(GapInterval::new(1, first - 1));
    }
    for pair in kept.windows(2) {
        if pair[1] - pair[0] > 1 {
            gaps.push(GapInterval::new(pair[0] + 1, pair[1] - 1));
        }
    }

    let label = |base: u32| {
        numbers
            .iter()
            .filter(|n| n.base == base)
            .max_by_key(|n| n.sort_key())
            .map(|n| n.canonical())
            .unwrap_or_else(|| ArticleNumber::new(base).canonical())
    };
    let first_label = numbers
        .iter()
        .filter(|n| n.base == first)
        .min_by_key(|n| n.sort_key())
        .map(|n| n.canonical())
        .unwrap_or_else(|| ArticleNumber::new(first).canonical());

    SequenceAnalysis {
        first_article: Some(first_label),
        last_article: Some(label(last)),
        last_number: last,
        expected_count,
        found_count,
        extraction_ratio: found_count as f64 / expected_count as f64,
        gaps,
        discarded,
    }
}

/// Return the prefix of `sorted` that survives tail-outlier correction.
fn trim_tail_outliers<'a>(sorted: &'a [u32], policy: &OutlierPolicy) -> &'a [u32] {
    let len = sorted.len();
    if len < 3 {
        return sorted;
    }
    let final_gap = sorted[len - 1] - sorted[len - 2];
    let local_gap = (sorted[len - 2] - sorted[len - 3]).max(1);
    let is_outlier =
        final_gap as f64 > local_gap as f64 * policy.ratio || final_gap > policy.absolute_gap;
    if !is_outlier {
        return sorted;
    }

    let mut end = 1;
    for i in (1..len - 1).rev() {
        if sorted[i] - sorted[i - 1] <= policy.max_local_step {
            end = i + 1;
            break;
        }
    }
    &sorted[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn records_for(nums: &[u32]) -> Vec<ArticleRecord> {
        nums.iter()
            .map(|n| ArticleRecord::article(&ArticleNumber::new(*n), "texto."))
            .collect()
    }

    #[test]
    fn reports_interior_gaps() {
        let a = analyze(&records_for(&[1, 2, 3, 5, 6, 9]), &OutlierPolicy::default());
        assert_eq!(a.expected_count, 9);
        assert_eq!(a.found_count, 6);
        assert_eq!(a.gaps, vec![GapInterval::new(4, 4), GapInterval::new(7, 8)]);
        assert_eq!(a.gaps[1].count, 2);
        assert_eq!(a.missing_count(), 3);
        assert_eq!(a.missing_numbers(), vec![4, 7, 8]);
        assert!((a.extraction_ratio - 6.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn corrects_tail_outlier() {
        let mut nums: Vec<u32> = (1..=49).collect();
        nums.push(612);
        let a = analyze(&records_for(&nums), &OutlierPolicy::default());
        assert_eq!(a.last_number, 49);
        assert_eq!(a.discarded, vec![612]);
        assert_eq!(a.expected_count, 49);
        assert_eq!(a.found_count, 49);
        assert!(a.gaps.is_empty());
        assert_eq!(a.last_article.as_deref(), Some("49"));
    }

    #[test]
    fn leading_gap_when_first_is_not_one() {
        let a = analyze(&records_for(&[3, 4, 5]), &OutlierPolicy::default());
        assert_eq!(a.gaps, vec![GapInterval::new(1, 2)]);
        assert_eq!(a.first_article.as_deref(), Some("3º"));
    }

    #[test]
    fn ignores_non_articles_and_suffixes() {
        let mut recs = records_for(&[1, 2]);
        recs.push(ArticleRecord::article(&ArticleNumber::parse("2-A").unwrap(), "x"));
        recs.push(ArticleRecord::element(RecordKind::Heading, "CAPÍTULO I", 0));
        let a = analyze(&recs, &OutlierPolicy::default());
        assert_eq!(a.found_count, 2);
        assert_eq!(a.last_article.as_deref(), Some("2º-A"));
        assert!(a.is_complete());
    }

    #[test]
    fn empty_set() {
        let a = analyze(&[], &OutlierPolicy::default());
        assert_eq!(a.expected_count, 0);
        assert_eq!(a.extraction_ratio, 0.0);
        assert!(a.gaps.is_empty());
    }

    #[test]
    fn moderate_tail_step_is_kept() {
        let a = analyze(&records_for(&[1, 2, 4, 6, 20]), &OutlierPolicy::default());
        assert_eq!(a.last_number, 20);
        assert!(a.discarded.is_empty());
    }

    #[test]
    fn policy_is_configurable() {
        let lenient = OutlierPolicy {
            ratio: 1000.0,
            absolute_gap: 1000,
            max_local_step: 20,
        };
        let mut nums: Vec<u32> = (1..=10).collect();
        nums.push(300);
        let a = analyze(&records_for(&nums), &lenient);
        assert_eq!(a.last_number, 300);
        assert_eq!(a.missing_count(), 289);
    }

    #[test]
    fn gap_kind_labels() {
        assert_eq!(GapKind::from_label("revogado"), Some(GapKind::Repealed));
        assert_eq!(GapKind::from_label("Vetoed"), Some(GapKind::Vetoed));
        assert_eq!(GapKind::from_label("not found"), Some(GapKind::NotFound));
        assert_eq!(GapKind::from_label("bogus"), None);
        assert_eq!(serde_json::to_string(&GapKind::NotFound).unwrap(), "\"not_found\"");
    }
}
