//! Raw-HTML article mining.
//!
//! Pulls `(number, fragment)` pairs for specific missing articles straight
//! out of raw HTML and markdown, tolerating tag noise inside the opener. Used
//! when the segmenter could not see an article through the page layout.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use lexcorpus_core::{ArticleNumber, ArticleRecord};

use crate::cleanup::{floor_boundary, html_to_plain, normalize_external_article};
use crate::sanitize::strip_struck_markup;

/// Longest fragment taken for one article.
pub const MAX_FRAGMENT_BYTES: usize = 6000;

/// Shortest body accepted for a mined article.
pub const MIN_BODY_CHARS: usize = 10;

static MINING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Opener with tags or entities between the parts: "Art.<b> 5</b><sup>o</sup>".
        r"Art(?:\s|&nbsp;|<[^>]{0,80}>)*\.?(?:\s|&nbsp;|<[^>]{0,80}>)*(\d{1,3}(?:\.\d{3})+|\d{1,4})(?:<[^>]{0,80}>)*(?:º|°|&ordm;|&deg;|o\b)?(?:<[^>]{0,80}>)*(?:-([A-Za-z]{1,2})\b)?",
        // Markdown bold opener: "**Art. 5º**".
        r"\*\*Art\.?\s*(\d{1,3}(?:\.\d{3})+|\d{1,4})\s*[º°o]?(?:-([A-Za-z]{1,2}))?\.?\*\*",
        // Named anchor: `<a name="art5">`.
        r#"(?i)<a\s[^>]*name\s*=\s*["']?art(\d{1,4})(?:-?([a-z]{1,2}))?["'>\s]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

struct Hit {
    start: usize,
    number: ArticleNumber,
}

fn hit_from(caps: &Captures<'_>) -> Option<Hit> {
    let whole = caps.get(0)?;
    let base: u32 = caps.get(1)?.as_str().replace('.', "").parse().ok()?;
    let suffix = caps.get(2).map(|m| m.as_str().to_ascii_uppercase());
    Some(Hit {
        start: whole.start(),
        number: ArticleNumber { base, suffix },
    })
}

/// Mine articles whose base number is in `wanted` from raw page text.
///
/// Suffixed articles are never returned. The first usable fragment per
/// number wins.
pub fn mine_articles(raw: &str, wanted: &[u32]) -> Vec<ArticleRecord> {
    if wanted.is_empty() || raw.is_empty() {
        return Vec::new();
    }
    let text = strip_struck_markup(raw);

    let mut hits: Vec<Hit> = MINING_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(&text).filter_map(|c| hit_from(&c)))
        .collect();
    hits.sort_by_key(|h| h.start);
    hits.dedup_by_key(|h| h.start);

    let mut found: BTreeMap<u32, ArticleRecord> = BTreeMap::new();
    for (i, hit) in hits.iter().enumerate() {
        let n = &hit.number;
        if n.suffix.is_some() || !wanted.contains(&n.base) || found.contains_key(&n.base) {
            continue;
        }
        let end = hits[i + 1..]
            .iter()
            .map(|h| h.start)
            .find(|&s| s > hit.start)
            .unwrap_or(text.len())
            .min(hit.start + MAX_FRAGMENT_BYTES);
        let fragment = &text[hit.start..floor_boundary(&text, end)];
        let plain = html_to_plain(&fragment.replace("**", ""));
        let record = ArticleRecord::article(n, "");
        let full = normalize_external_article(n, &plain);
        if full.chars().count() < record.text.chars().count() + MIN_BODY_CHARS {
            continue;
        }
        found.insert(
            n.base,
            ArticleRecord {
                text: full,
                ..record
            },
        );
    }
    debug!(wanted = wanted.len(), mined = found.len(), "mined raw html");
    found.into_values().collect()
}
