//! Structured records produced from a statute's text.

use serde::{Deserialize, Serialize};

use crate::numbering::ArticleNumber;

/// First sort key used for closing records (date line, signatures, notices).
pub const CLOSING_BASE: i64 = 1_000_000_000;

/// What a record represents in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Unclassified text before the law title (site chrome, issuing office).
    Header,
    Title,
    Ementa,
    Preamble,
    /// Structural division: book, part, title, chapter, section, subsection.
    Heading,
    Article,
    /// Date and place line closing the statute.
    Closing,
    Signature,
    /// "This text does not replace the official publication" notice.
    Notice,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Title => "title",
            Self::Ementa => "ementa",
            Self::Preamble => "preamble",
            Self::Heading => "heading",
            Self::Article => "article",
            Self::Closing => "closing",
            Self::Signature => "signature",
            Self::Notice => "notice",
        }
    }
}

/// One discrete unit of the statute: an article or a non-article element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Canonical article number (`"1º"`, `"14"`, `"14-A"`); `None` for non-articles.
    pub number: Option<String>,
    /// Full text. Articles always start with `Art. {number}`.
    pub text: String,
    /// Sort key preserving source order.
    pub order: i64,
    pub kind: RecordKind,
}

impl ArticleRecord {
    /// Build an article record, prefixing the body with the canonical opener.
    pub fn article(number: &ArticleNumber, body: &str) -> Self {
        Self {
            number: Some(number.canonical()),
            text: number.opener_with(body),
            order: number.sort_key(),
            kind: RecordKind::Article,
        }
    }

    /// Build a non-article record.
    pub fn element(kind: RecordKind, text: impl Into<String>, order: i64) -> Self {
        Self {
            number: None,
            text: text.into(),
            order,
            kind,
        }
    }

    pub fn is_article(&self) -> bool {
        self.kind == RecordKind::Article && self.number.is_some()
    }

    /// Parsed article number, if this is an article.
    pub fn article_number(&self) -> Option<ArticleNumber> {
        self.number.as_deref().and_then(ArticleNumber::parse)
    }

    /// Base integer of the article number (`14` for `"14-A"`).
    pub fn base_number(&self) -> Option<u32> {
        self.article_number().map(|n| n.base)
    }
}

/// Sort records by `order`, keeping source order for equal keys.
///
/// A heading between articles shares the order of the article it follows
/// and sorts right after it, so it stays ahead of the next article whatever
/// that article's suffix is.
pub fn sort_records(records: &mut [ArticleRecord]) {
    records.sort_by_key(|r| (r.order, !r.is_article()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_constructor_prefixes_opener() {
        let n = ArticleNumber::parse("4").unwrap();
        let rec = ArticleRecord::article(&n, "Esta Lei entra em vigor.");
        assert_eq!(rec.number.as_deref(), Some("4º"));
        assert_eq!(rec.text, "Art. 4º Esta Lei entra em vigor.");
        assert_eq!(rec.order, 4000);
        assert!(rec.is_article());
        assert_eq!(rec.base_number(), Some(4));
    }

    #[test]
    fn element_has_no_number() {
        let rec = ArticleRecord::element(RecordKind::Title, "LEI Nº 1, DE 2000", 0);
        assert!(!rec.is_article());
        assert_eq!(rec.base_number(), None);
    }

    #[test]
    fn kind_serialises_snake_case() {
        let json = serde_json::to_string(&RecordKind::Ementa).unwrap();
        assert_eq!(json, "\"ementa\"");
        assert_eq!(RecordKind::Notice.as_str(), "notice");
    }

    fn art(raw: &str) -> ArticleRecord {
        ArticleRecord::article(&ArticleNumber::parse(raw).unwrap(), "x")
    }

    #[test]
    fn sort_keeps_headings_between_articles() {
        let a10 = art("10");
        let a11 = art("11");
        let h = ArticleRecord::element(RecordKind::Heading, "CAPÍTULO II", a10.order);
        let mut recs = vec![a11.clone(), h.clone(), a10.clone()];
        sort_records(&mut recs);
        assert_eq!(recs, vec![a10, h, a11]);
    }

    #[test]
    fn heading_stays_ahead_of_suffixed_articles() {
        let a14 = art("14");
        let a14a = art("14-A");
        let a14zz = art("14-ZZ");
        let a15 = art("15");
        let h1 = ArticleRecord::element(RecordKind::Heading, "CAPÍTULO IV-A", a14.order);
        let h2 = ArticleRecord::element(RecordKind::Heading, "CAPÍTULO IV-B", a14zz.order);
        let mut recs = vec![
            a15.clone(),
            h2.clone(),
            a14zz.clone(),
            a14a.clone(),
            h1.clone(),
            a14.clone(),
        ];
        sort_records(&mut recs);
        assert_eq!(recs, vec![a14, h1, a14a, a14zz, h2, a15]);
    }
}
