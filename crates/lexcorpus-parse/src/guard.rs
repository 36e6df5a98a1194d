//! Alteration-block guard.
//!
//! Two independent checks keep article numbers that belong to other statutes
//! out of the record set: a quote tracker for amending clauses that reproduce
//! foreign articles verbatim, and a jump test for candidates far beyond the
//! recent sequence.

use std::sync::LazyLock;

use regex::Regex;

use lexcorpus_core::GuardPolicy;

static AMENDMENT_INTRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:passa(?:m)?\s+a\s+vigorar|fica(?:m)?\s+acrescid[oa]s?|fica(?:m)?\s+alterad[oa]s?|fica(?:m)?\s+inserid[oa]s?|com\s+a\s+seguinte\s+reda[çc][ãa]o|com\s+as\s+seguintes\s+altera[çc][õo]es|acrescid[oa]s?\s+d[oa]s?\s+seguintes?|a\s+vigorar\s+acrescid[oa])",
    )
    .unwrap()
});

/// Whether `line` introduces a quoted amendment to another statute.
pub fn is_amendment_intro(line: &str) -> bool {
    AMENDMENT_INTRO_RE.is_match(line)
}

/// Quote balance inside an amending clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuoteTracker {
    depth: i32,
    straight_open: bool,
    seen_quote: bool,
    lines: usize,
}

impl QuoteTracker {
    /// Feed one line. Returns `None` once the quoted block is over.
    pub fn observe(mut self, line: &str, policy: &GuardPolicy) -> Option<Self> {
        let opens = line.matches('“').count() as i32;
        let closes = line.matches('”').count() as i32;
        let straight = line.matches('"').count();
        self.depth += opens - closes;
        if straight % 2 == 1 {
            self.straight_open = !self.straight_open;
        }
        self.seen_quote |= opens + closes > 0 || straight > 0;
        self.lines += 1;

        let balanced = self.depth <= 0 && !self.straight_open;
        let over = self.lines >= policy.max_quoted_lines;
        if line.contains("(NR)") || (self.seen_quote && balanced) || over {
            None
        } else {
            Some(self)
        }
    }

    /// Whether any quotation mark has been seen since the intro.
    pub fn seen_quote(&self) -> bool {
        self.seen_quote
    }

    /// Start tracking at the intro line itself.
    pub fn start(intro: &str, policy: &GuardPolicy) -> Option<Self> {
        Self::default().observe(intro, policy)
    }
}

/// Whether `candidate` jumps implausibly far past the accepted sequence.
///
/// Looks at the last `policy.window` accepted base numbers; the candidate is
/// an outlier when it exceeds their maximum by more than
/// `max(min_jump, median_step * step_multiplier)`.
pub fn is_outlier_jump(candidate: u32, accepted: &[u32], policy: &GuardPolicy) -> bool {
    let window = &accepted[accepted.len().saturating_sub(policy.window.max(1))..];
    let Some(&local_max) = window.iter().max() else {
        return false;
    };
    if candidate <= local_max {
        return false;
    }

    let mut steps: Vec<u32> = window
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]).max(1))
        .collect();
    steps.sort_unstable();
    let median = steps.get(steps.len() / 2).copied().unwrap_or(1);
    let threshold = policy.min_jump.max(median.saturating_mul(policy.step_multiplier));
    candidate - local_max > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_amendment_intro() {
        assert!(is_amendment_intro(
            "Art. 2º O art. 5º da Lei nº 8.112, de 1990, passa a vigorar com a seguinte redação:"
        ));
        assert!(is_amendment_intro("A Lei nº 9.099 fica acrescida do seguinte art. 5º-A:"));
        assert!(!is_amendment_intro(
            "Art. 3º Esta Lei entra em vigor na data de sua publicação."
        ));
    }

    #[test]
    fn tracker_exits_on_balanced_quotes() {
        let policy = GuardPolicy::default();
        let t = QuoteTracker::start("passa a vigorar com a seguinte redação:", &policy).unwrap();
        let t = t.observe("“Art. 5º O servidor", &policy).unwrap();
        assert!(t.seen_quote());
        let t = t.observe("I - texto;", &policy).unwrap();
        assert!(t.observe("II - outro texto.”", &policy).is_none());
    }

    #[test]
    fn tracker_exits_on_nr_marker() {
        let policy = GuardPolicy::default();
        let t = QuoteTracker::start("com a seguinte redação:", &policy).unwrap();
        assert!(t.observe("Art. 5º texto (NR)", &policy).is_none());
    }

    #[test]
    fn tracker_exits_on_inline_quote() {
        let policy = GuardPolicy::default();
        assert!(
            QuoteTracker::start("passa a vigorar acrescido do inciso: “IV - x.”", &policy).is_none()
        );
    }

    #[test]
    fn tracker_is_bounded() {
        let policy = GuardPolicy {
            max_quoted_lines: 3,
            ..GuardPolicy::default()
        };
        let t = QuoteTracker::start("com a seguinte redação:", &policy).unwrap();
        let t = t.observe("“Art. 1º", &policy).unwrap();
        assert!(t.observe("texto sem fim", &policy).is_none());
    }

    #[test]
    fn straight_quotes_toggle() {
        let policy = GuardPolicy::default();
        let t = QuoteTracker::start("com a seguinte redação:", &policy).unwrap();
        let t = t.observe("\"Art. 7º texto", &policy).unwrap();
        assert!(t.observe("fim.\"", &policy).is_none());
    }

    #[test]
    fn outlier_jump_against_recent_window() {
        let policy = GuardPolicy::default();
        let accepted = [1, 2, 3, 4, 5];
        assert!(!is_outlier_jump(6, &accepted, &policy));
        assert!(!is_outlier_jump(20, &accepted, &policy));
        assert!(is_outlier_jump(121, &accepted, &policy));
        assert!(!is_outlier_jump(3, &accepted, &policy));
        assert!(!is_outlier_jump(612, &[], &policy));
    }

    #[test]
    fn outlier_threshold_scales_with_step() {
        let policy = GuardPolicy::default();
        let sparse = [10, 20, 30, 40, 50];
        assert!(!is_outlier_jump(120, &sparse, &policy));
        assert!(is_outlier_jump(200, &sparse, &policy));
    }
}
