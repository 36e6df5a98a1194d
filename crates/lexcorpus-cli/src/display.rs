//! Vertical card display for ingestion outcomes.
//!
//! Renders the sequence analysis, gaps, recovery log, repair and storage
//! reports as grouped sections, and records as an Arrow table.

use arrow::util::pretty::pretty_format_batches;

use lexcorpus_core::schema::articles;
use lexcorpus_core::{ArticleRecord, GapInterval, SequenceAnalysis};
use lexcorpus_sync::IngestOutcome;

const MAX_TEXT_CHARS: usize = 80;

// ── Public API ──

/// Print an ingestion outcome as a vertical card.
pub fn print_outcome(outcome: &IngestOutcome) {
    println!("=== {} ===", outcome.title().unwrap_or("(untitled)"));
    println!(
        "  {:<26} {}",
        "result",
        if outcome.success { "success" } else { "failed" }
    );
    println!("  {:<26} {:?}", "mode", outcome.mode);
    println!("  {:<26} {}", "started", outcome.started_at.to_rfc3339());
    if let Some(err) = &outcome.error {
        println!("  {:<26} {}", "error", err);
    }
    println!(
        "  {:<26} {} ({} articles)",
        "records",
        outcome.records.len(),
        outcome.article_count()
    );
    println!();

    print_analysis(&outcome.analysis);
    print_gaps(&outcome.analysis.gaps);
    if let Some(summary) = &outcome.summary {
        println!("Gap summary");
        println!("  {summary}");
        println!();
    }

    if let Some(run) = &outcome.recovery {
        println!("Recovery");
        for step in &run.steps {
            let status = if step.skipped {
                "skipped".to_string()
            } else {
                format!("+{} articles, {} missing", step.added, step.remaining)
            };
            println!("  {:<26} {}", step.method.to_string(), status);
        }
        for source in &run.sources {
            println!("  {:<26} {}", "source", source);
        }
        println!();
    }

    if let Some(cleanup) = &outcome.cleanup {
        println!("AI cleanup");
        println!("  {:<26} {:?}", "verdict", cleanup);
        println!();
    }

    if let Some(repair) = &outcome.repair
        && repair.flagged > 0
    {
        println!("Repair");
        println!("  {:<26} {}", "flagged", repair.flagged);
        println!("  {:<26} {}", "repaired", repair.repaired);
        println!("  {:<26} {}", "rejected", repair.rejected);
        println!(
            "  {:<26} {} ({} failed)",
            "batches", repair.batches, repair.failed_batches
        );
        for (number, note) in &repair.notes {
            println!("  {:<26} {}", format!("art. {number}"), note);
        }
        println!();
    }

    if let Some(write) = &outcome.write {
        println!("Storage");
        println!("  {:<26} {}", "written", write.written);
        println!(
            "  {:<26} {} ({} failed)",
            "batches", write.batches, write.failed_batches
        );
        for err in &write.errors {
            println!("  {:<26} {}", "error", err);
        }
        println!();
    }
}

/// Print the numeric sequence section.
pub fn print_analysis(analysis: &SequenceAnalysis) {
    println!("Sequence");
    if let (Some(first), Some(last)) = (&analysis.first_article, &analysis.last_article) {
        println!("  {:<26} {} .. {}", "articles", first, last);
    }
    println!("  {:<26} {}", "expected", analysis.expected_count);
    println!("  {:<26} {}", "found", analysis.found_count);
    println!(
        "  {:<26} {:.1}%",
        "extraction",
        analysis.extraction_ratio * 100.0
    );
    if !analysis.discarded.is_empty() {
        println!("  {:<26} {:?}", "discarded outliers", analysis.discarded);
    }
    println!();
}

/// Print the remaining gaps, if any.
pub fn print_gaps(gaps: &[GapInterval]) {
    if gaps.is_empty() {
        return;
    }
    println!("Gaps ({})", gaps.len());
    for g in gaps {
        let range = if g.from == g.to {
            format!("{}", g.from)
        } else {
            format!("{}-{}", g.from, g.to)
        };
        print!("  {:<26} {}", range, g.kind.as_str());
        if let Some(reason) = &g.reason {
            print!("  {reason}");
        }
        println!();
    }
    println!();
}

/// Print records as a table, with long texts shortened.
pub fn print_records(records: &[ArticleRecord]) -> anyhow::Result<()> {
    let shortened: Vec<ArticleRecord> = records
        .iter()
        .map(|r| ArticleRecord {
            text: shorten(&r.text, MAX_TEXT_CHARS),
            ..r.clone()
        })
        .collect();
    let batch = articles::records_to_batch(&shortened)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

// ── Helpers ──

/// First `max` characters of the first line, with an ellipsis when cut.
fn shorten(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == text.len() {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
