//! Markup sanitizer: struck-through removal, text extraction, and structural
//! line-break reconstruction.
//!
//! The primary path parses a real DOM with `scraper` and drops struck
//! elements before reading any text. When that yields almost nothing the
//! regex fallback removes the same struck patterns by string matching. Both
//! paths finish in [`normalize_layout`], so their outputs share one contract.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::cleanup::{collapse_whitespace, html_to_plain};

/// DOM text shorter than this triggers the regex fallback.
pub const MIN_DOM_TEXT: usize = 100;

const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "noscript", "template"];
const STRUCK_TAGS: &[&str] = &["strike", "s", "del"];
const STRUCK_CLASS_HINTS: &[&str] = &["strike", "line-through", "riscado", "tachado"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "td", "th", "table", "tbody", "h1", "h2", "h3",
    "h4", "h5", "h6", "blockquote", "center", "section", "article", "hr", "pre", "dd", "dt",
    "body", "title",
];

static STRUCK_FALLBACK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<strike\b[^>]*>.*?</strike\s*>",
        r"(?is)<del\b[^>]*>.*?</del\s*>",
        r"(?is)<s\b[^>]*>.*?</s\s*>",
        r#"(?is)<(?:span|font)\b[^>]*(?:line-through|class\s*=\s*["'][^"']*(?:strike|riscado|tachado))[^>]*>.*?</(?:span|font)\s*>"#,
        r#"(?is)<p\b[^>]*(?:line-through|class\s*=\s*["'][^"']*(?:strike|riscado|tachado))[^>]*>.*?</p\s*>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static MD_STRUCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)~~.+?~~").unwrap());
static MD_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static MD_EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*|__").unwrap());
static MD_LINE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:#{1,6}|>+)\s*").unwrap());
static MD_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([\\`*_{}\[\]()#+\-.!|~>])").unwrap());

/// Line-break rules, applied in order to whitespace-collapsed text.
///
/// Every pattern consumes the whitespace it replaces with a newline, so
/// collapsing the output and re-applying yields the same text.
static LAYOUT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"\s+((?:LIVRO|PARTE|TÍTULO|CAPÍTULO|SEÇÃO|SUBSEÇÃO)\s+(?:[IVXLCDM]+(?:-[A-Z])?\b|ÚNIC[OA]\b|GERAL\b|ESPECIAL\b))",
            "\n$1",
        ),
        (
            r"([.;:!?)]|[A-ZÀ-Ý]{2})\s+((?:Livro|Parte|Título|Capítulo|Seção|Subseção)\s+(?:[IVXLCDM]+(?:-[A-Z])?\b|Únic[oa]\b))",
            "$1\n$2",
        ),
        (r#"\s+([“"]?Art\.?\s?\d)"#, "\n$1"),
        (r"([.;:)])\s+(§\s?\d)", "$1\n$2"),
        (r"\s+(Parágrafo único)", "\n$1"),
        (r"([.;:)])\s+([IVXLC]+\s?[-–—]\s)", "$1\n$2"),
        (r"([.;:)])\s+([a-z]\)\s)", "$1\n$2"),
        (
            r"\s+((?:O|A) PRESIDENT[EA] DA REPÚBLICA|O VICE-PRESIDENTE DA REPÚBLICA|O CONGRESSO NACIONAL\b|O PRESIDENTE DO SENADO FEDERAL|A MESA DA CÂMARA DOS DEPUTADOS)",
            "\n$1",
        ),
        (
            r"(\d{4}\.?)\s+(Dispõe|Institui|Altera|Estabelece|Regulamenta|Cria|Autoriza|Aprova|Define|Acrescenta|Revoga|Modifica|Denomina|Declara|Concede|Abre|Torna|Ratifica|Promulga|Dá nova redação)\b",
            "$1\n$2",
        ),
        (
            r"([.;)])\s+([A-ZÀ-Ý][a-zà-ÿ]+(?:\s+(?:d[aeo]s?\s+)?[A-ZÀ-Ý][a-zà-ÿ]+)*\s*,\s*(?:em\s+)?\d{1,2}º?\s+de\s+[a-zç]+\s+de\s+\d{4})",
            "$1\n$2",
        ),
        (r"(da\s+República\.)\s+", "$1\n"),
        (r"\s+(Este texto não substitui)", "\n$1"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).unwrap(), r))
    .collect()
});

/// Sanitize a raw HTML page into normalised statute text.
pub fn sanitize_html(html: &str) -> String {
    let text = dom_text(html);
    if text.chars().count() >= MIN_DOM_TEXT {
        return normalize_layout(&text);
    }
    debug!(dom_chars = text.len(), "DOM text too short, using regex fallback");
    normalize_layout(&regex_fallback_text(html))
}

/// Sanitize markdown returned by the fetch service.
pub fn sanitize_markdown(markdown: &str) -> String {
    let s = MD_STRUCK_RE.replace_all(markdown, " ");
    let s = MD_IMAGE_RE.replace_all(&s, " ");
    let s = MD_LINK_RE.replace_all(&s, "$1");
    let s = MD_LINE_PREFIX_RE.replace_all(&s, "");
    let s = MD_EMPHASIS_RE.replace_all(&s, "");
    let s = MD_ESCAPE_RE.replace_all(&s, "$1");
    normalize_layout(&s)
}

/// Pick the best available source representation and sanitize it.
///
/// HTML wins when present; markdown is used otherwise. Returns `None` when
/// neither is present.
pub fn sanitize_source(html: Option<&str>, markdown: Option<&str>) -> Option<String> {
    match (html.filter(|h| !h.trim().is_empty()), markdown) {
        (Some(h), _) => Some(sanitize_html(h)),
        (None, Some(md)) if !md.trim().is_empty() => Some(sanitize_markdown(md)),
        _ => None,
    }
}

/// Collapse whitespace, then re-insert line breaks at structural boundaries.
pub fn normalize_layout(text: &str) -> String {
    let mut out = collapse_whitespace(text);
    for (re, replacement) in LAYOUT_RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Visible text of the document with struck elements removed.
pub fn dom_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    collect_text(doc.root_element(), &mut out);
    collapse_whitespace(&out)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if SKIPPED_TAGS.contains(&name) || is_struck(el) {
        return;
    }
    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push(' ');
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
    if block {
        out.push(' ');
    }
}

fn is_struck(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if STRUCK_TAGS.contains(&value.name()) {
        return true;
    }
    let styled = value
        .attr("style")
        .is_some_and(|s| s.to_ascii_lowercase().contains("line-through"));
    styled
        || value.classes().any(|c| {
            let c = c.to_ascii_lowercase();
            STRUCK_CLASS_HINTS.iter().any(|hint| c.contains(hint))
        })
}

/// Remove struck-through elements from raw markup by string matching.
pub fn strip_struck_markup(html: &str) -> String {
    let mut s = html.to_string();
    for re in STRUCK_FALLBACK_RES.iter() {
        s = re.replace_all(&s, " ").into_owned();
    }
    s
}

fn regex_fallback_text(html: &str) -> String {
    html_to_plain(&strip_struck_markup(html))
}
