//! Text cleanup shared by the segmenter, the miners, and AI response handling.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use lexcorpus_core::ArticleNumber;

const CITATION_KEYWORDS: &str = r"inclu[ií]d[oa]s?|reda[çc][ãa]o\s+dada|renumerad[oa]s?|acrescid[oa]s?|alterad[oa]s?|vide|vig[êe]ncia|produ[çc][ãa]o\s+de\s+efeitos?|regulamento|regulamentad[oa]s?|promulga[çc][ãa]o|convers[ãa]o|restabelecid[oa]s?|suspens[oa]s?|revigorad[oa]s?";

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\(\s*(?:{CITATION_KEYWORDS})\b[^()]*(?:\([^()]*\)[^()]*)*\)"
    ))
    .unwrap()
});
/// A citation opener, closed or not.
static CITATION_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\(\s*(?:{CITATION_KEYWORDS})\b")).unwrap());
static REVOKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*(revogad[oa]s?)\b[^()]*(?:\([^()]*\)[^()]*)*\)").unwrap()
});
static VETO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s*vetad[oa]s?\s*\)").unwrap());
static VETO_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\(\s*vetad[oa]s?\s*\)\s*\.?$").unwrap());
static INLINE_SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +([.,;:])").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)</?\s*([a-zA-Z0-9]*)[^>]*>").unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").unwrap());
static PARAGRAPH_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:§\s*\d|Parágrafo único)").unwrap());
static ENUMERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[IVXLC]+\s*[-–—]|[a-z]\))").unwrap());
static QUOTED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[“"]?(?:Art\.?\s*\d|CAPÍTULO|SEÇÃO|Seção|Subseção|TÍTULO|LIVRO)"#).unwrap()
});
static ARTICLE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[\s“\x22])Art\.?\s*\d").unwrap());
static ROMAN_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[\s:;])[IVXLC]+\s*[-–—]\s").unwrap());

/// Tags that never separate words ("1<sup>o</sup>" reads "1o").
const INLINE_TAGS: &[&str] = &[
    "a", "b", "i", "u", "em", "strong", "span", "font", "sup", "sub", "small", "abbr",
];

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&ordm;", "º"),
    ("&ordf;", "ª"),
    ("&deg;", "°"),
    ("&sect;", "§"),
    ("&ldquo;", "“"),
    ("&rdquo;", "”"),
    ("&ndash;", "–"),
    ("&mdash;", "—"),
    ("&aacute;", "á"),
    ("&eacute;", "é"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&Aacute;", "Á"),
    ("&Eacute;", "É"),
    ("&Iacute;", "Í"),
    ("&Oacute;", "Ó"),
    ("&Uacute;", "Ú"),
    ("&atilde;", "ã"),
    ("&otilde;", "õ"),
    ("&Atilde;", "Ã"),
    ("&Otilde;", "Õ"),
    ("&acirc;", "â"),
    ("&ecirc;", "ê"),
    ("&ocirc;", "ô"),
    ("&Acirc;", "Â"),
    ("&Ecirc;", "Ê"),
    ("&Ocirc;", "Ô"),
    ("&agrave;", "à"),
    ("&Agrave;", "À"),
    ("&ccedil;", "ç"),
    ("&Ccedil;", "Ç"),
    ("&uuml;", "ü"),
    // Last so "&amp;lt;" decodes to "&lt;", not "<".
    ("&amp;", "&"),
];

/// Collapse every whitespace run (newlines included) to one space.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Decode the HTML entities that occur in legislation pages.
pub fn decode_entities(s: &str) -> String {
    let mut out = NUMERIC_ENTITY_RE
        .replace_all(s, |c: &Captures| {
            let code = match (c.get(1), c.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse().ok(),
                _ => None,
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned();
    for (entity, ch) in NAMED_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, ch);
        }
    }
    out
}

/// Remove tags (and script/style bodies), decode entities, collapse whitespace.
pub fn html_to_plain(fragment: &str) -> String {
    let s = SCRIPT_RE.replace_all(fragment, " ");
    let s = STYLE_RE.replace_all(&s, " ");
    let s = TAG_RE.replace_all(&s, |c: &Captures| {
        let name = c[1].to_ascii_lowercase();
        if INLINE_TAGS.contains(&name.as_str()) {
            ""
        } else {
            " "
        }
    });
    collapse_whitespace(&decode_entities(&s))
}

/// Strip amendment citations, keeping only `(VETADO)` and `(Revogado)` markers.
///
/// Newlines are preserved; runs of spaces left behind are collapsed.
pub fn strip_citations(text: &str) -> String {
    let s = CITATION_RE.replace_all(text, "");
    let s = REVOKED_RE.replace_all(&s, |c: &Captures| {
        let word = c[1].to_lowercase();
        let mut chars = word.chars();
        let capitalised: String = chars
            .next()
            .map(|f| f.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        format!("({capitalised})")
    });
    let s = VETO_RE.replace_all(&s, "(VETADO)");
    let s = INLINE_SPACES_RE.replace_all(&s, " ");
    let s = SPACE_BEFORE_PUNCT_RE.replace_all(&s, "$1");
    s.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Whether `text` still carries an amendment citation.
///
/// Matches the opener alone, so on text that went through
/// [`strip_citations`] it finds the remnants that one cannot remove: a
/// citation whose closing parenthesis was cut off by the page.
pub fn has_residual_citation(text: &str) -> bool {
    CITATION_OPEN_RE.is_match(text)
}

pub fn is_veto_line(line: &str) -> bool {
    VETO_LINE_RE.is_match(line.trim())
}

/// Number of `Art. N` openers in `text`, quoted ones included.
pub fn count_article_openers(text: &str) -> usize {
    ARTICLE_MARKER_RE.find_iter(text).count()
}

/// Number of roman-numeral enumeration items (`I -`, `II –`) in `text`.
pub fn count_roman_items(text: &str) -> usize {
    ROMAN_ITEM_RE.find_iter(text).count()
}

fn starts_paragraph(line: &str) -> bool {
    PARAGRAPH_MARKER_RE.is_match(line)
        || ENUMERATION_RE.is_match(line)
        || QUOTED_BLOCK_RE.is_match(line)
}

/// Rebuild an article body from the lines accumulated for it.
///
/// Lines that do not open a paragraph, item, or quoted block are wrapped
/// continuations and get rejoined to the previous line. A veto marker alone
/// on the line after the opener is merged onto the opener. Paragraphs (`§`,
/// `Parágrafo único`) and enumeration items after sentence-ending punctuation
/// are separated by a blank line.
pub fn render_article_body(lines: &[String]) -> String {
    let mut lines: Vec<&str> = lines.iter().map(|l| l.trim()).collect();
    if lines.len() >= 2
        && lines[0].trim_matches(['.', '-', '–', ' ']).is_empty()
        && is_veto_line(lines[1])
    {
        lines[0] = "(VETADO)";
        lines.remove(1);
    }

    let mut paras: Vec<String> = Vec::new();
    for line in lines.into_iter().filter(|l| !l.is_empty()) {
        match paras.last_mut() {
            Some(last) if !starts_paragraph(line) => {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(line);
            }
            _ => paras.push(line.to_string()),
        }
    }

    let mut out = String::new();
    for (i, para) in paras.iter().enumerate() {
        if i > 0 {
            let prev_ends_sentence = paras[i - 1].ends_with(['.', ';', ':']);
            let blank = PARAGRAPH_MARKER_RE.is_match(para)
                || (ENUMERATION_RE.is_match(para) && prev_ends_sentence);
            out.push_str(if blank { "\n\n" } else { "\n" });
        }
        out.push_str(para);
    }
    strip_citations(&out)
}

/// Full article text: canonical opener plus the rebuilt body.
pub fn article_text(number: &ArticleNumber, lines: &[String]) -> String {
    number.opener_with(&render_article_body(lines))
}

/// Clean an article text that came from outside the segmenter (AI, miners,
/// alternate corpus): drop citations and force the canonical opener.
pub fn normalize_external_article(number: &ArticleNumber, text: &str) -> String {
    let text = strip_citations(text.trim());
    let body = crate::classify::strip_article_opener(&text).unwrap_or(&text);
    let lines: Vec<String> = body.lines().map(str::to_string).collect();
    article_text(number, &lines)
}

/// Clamp `idx` down to the nearest char boundary of `s`.
pub fn floor_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// The first `max_chars` bytes of `s` (on a char boundary), or all of it.
pub fn head_window(s: &str, max_chars: usize) -> &str {
    &s[..floor_boundary(s, max_chars)]
}
