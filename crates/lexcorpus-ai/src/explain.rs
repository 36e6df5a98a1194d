//! Gap explainer: classify why each remaining gap exists.

use serde::Deserialize;
use tracing::{info, warn};

use lexcorpus_core::{GapInterval, GapKind};
use lexcorpus_parse::cleanup::head_window;

use crate::json::parse_lenient;
use crate::prompts::build_explanation_prompt;
use crate::service::TextService;

/// Classified gaps plus an overall narrative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapExplanation {
    pub gaps: Vec<GapInterval>,
    pub summary: Option<String>,
}

#[derive(Deserialize)]
struct ExplanationResponse {
    gaps: Vec<ExplainedGap>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Deserialize)]
struct ExplainedGap {
    from: u32,
    to: u32,
    kind: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Ask `service` to classify each interval in `gaps`.
///
/// Classifications are only taken from a well-formed JSON answer; any other
/// outcome leaves every interval as `not_found` without a reason.
pub async fn explain_gaps(
    service: &dyn TextService,
    title: Option<&str>,
    gaps: &[GapInterval],
    source: &str,
    window_chars: usize,
) -> GapExplanation {
    let mut out = GapExplanation {
        gaps: gaps
            .iter()
            .cloned()
            .map(|g| GapInterval {
                kind: GapKind::NotFound,
                reason: None,
                ..g
            })
            .collect(),
        summary: None,
    };
    if gaps.is_empty() {
        return out;
    }

    let prompt = build_explanation_prompt(title, gaps, head_window(source, window_chars));
    let response = match service.complete(&prompt).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "gap explanation failed");
            return out;
        }
    };
    let Some(parsed) = parse_lenient::<ExplanationResponse>(&response) else {
        warn!("gap explanation returned malformed JSON");
        return out;
    };

    for answer in parsed.gaps {
        let Some(kind) = GapKind::from_label(&answer.kind) else {
            continue;
        };
        if let Some(gap) = out
            .gaps
            .iter_mut()
            .find(|g| g.from == answer.from && g.to == answer.to)
        {
            gap.kind = kind;
            gap.reason = answer
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
        }
    }
    out.summary = parsed
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    info!(
        gaps = out.gaps.len(),
        explained = out.gaps.iter().filter(|g| g.reason.is_some()).count(),
        "gap explanation"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;

    const NEEDLE: &str = "LACUNAS:";

    #[tokio::test]
    async fn applies_well_formed_classification() {
        let svc = ScriptedService::new().on(
            NEEDLE,
            r#"{"gaps":[{"from":7,"to":8,"kind":"revogado","reason":"Revogados pela Lei nº 2."},
                        {"from":20,"to":20,"kind":"vetoed","reason":"Veto parcial."},
                        {"from":99,"to":99,"kind":"vetoed"}],
                "summary":"Dois intervalos explicados."}"#,
        );
        let gaps = vec![GapInterval::new(7, 8), GapInterval::new(20, 20), GapInterval::new(30, 31)];
        let e = explain_gaps(&svc, None, &gaps, "fonte", 1000).await;
        assert_eq!(e.gaps[0].kind, GapKind::Repealed);
        assert_eq!(e.gaps[0].reason.as_deref(), Some("Revogados pela Lei nº 2."));
        assert_eq!(e.gaps[1].kind, GapKind::Vetoed);
        assert_eq!(e.gaps[2].kind, GapKind::NotFound);
        assert_eq!(e.gaps[2].count, 2);
        assert_eq!(e.summary.as_deref(), Some("Dois intervalos explicados."));
    }

    #[tokio::test]
    async fn malformed_answer_leaves_not_found() {
        let svc = ScriptedService::new().on(NEEDLE, "Os artigos 7 e 8 foram revogados.");
        let e = explain_gaps(&svc, None, &[GapInterval::new(7, 8)], "", 1000).await;
        assert_eq!(e.gaps[0].kind, GapKind::NotFound);
        assert_eq!(e.gaps[0].reason, None);
        assert_eq!(e.summary, None);
    }

    #[tokio::test]
    async fn unknown_kind_is_ignored() {
        let svc = ScriptedService::new().on(
            NEEDLE,
            r#"{"gaps":[{"from":7,"to":7,"kind":"talvez","reason":"?"}]}"#,
        );
        let e = explain_gaps(&svc, None, &[GapInterval::new(7, 7)], "", 1000).await;
        assert_eq!(e.gaps[0].kind, GapKind::NotFound);
        assert_eq!(e.gaps[0].reason, None);
    }

    #[tokio::test]
    async fn no_gaps_no_call() {
        let svc = ScriptedService::new();
        let e = explain_gaps(&svc, None, &[], "", 1000).await;
        assert!(e.gaps.is_empty());
        assert!(svc.calls().is_empty());
    }
}
