//! Article number normalisation for Brazilian statutes.
//!
//! Converts raw article numerals as they appear on the page ("4", "4º",
//! "4o", "4-a", "1.000") into the canonical form used by the corpus and a
//! numeric sort key that recovers document order.
//!
//! # Numbering conventions
//!
//! - Articles 1 to 9 are ordinals: `Art. 1º`, `Art. 9º`
//! - Articles 10 and above are cardinals: `Art. 10.`, `Art. 245.`
//! - Inserted articles carry an uppercase letter suffix: `Art. 4º-A` between
//!   `Art. 4º` and `Art. 5º`, `Art. 14-B` after `Art. 14-A`

/// The canonical ordinal indicator.
pub const ORDINAL: char = 'º';

/// Glyphs that pages use in place of the ordinal indicator.
const ORDINAL_VARIANTS: &[char] = &['º', '°', 'ᵒ', '˚', 'ª'];

/// A parsed article number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleNumber {
    pub base: u32,
    /// Uppercase letter suffix of an inserted article, e.g. `"A"` in `14-A`.
    pub suffix: Option<String>,
}

impl ArticleNumber {
    pub fn new(base: u32) -> Self {
        Self { base, suffix: None }
    }

    /// Parse a raw numeral token, tolerating an `Art`/`Art.` prefix.
    ///
    /// Returns `None` when the token has no leading digits or the number is 0.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut s = raw.trim();
        for prefix in ["Art.", "art.", "ART.", "Art", "art", "ART"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.trim_start();
                break;
            }
        }

        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;
        let mut digits = String::new();
        while i < chars.len() {
            let c = chars[i];
            if c.is_ascii_digit() {
                digits.push(c);
                i += 1;
            } else if c == '.'
                && !digits.is_empty()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
            {
                // Thousands separator: "1.000".
                i += 1;
            } else {
                break;
            }
        }
        let base: u32 = digits.parse().ok()?;
        if base == 0 {
            return None;
        }

        // Ordinal indicator, including the superscript "o" flattened to plain text.
        if let Some(&c) = chars.get(i) {
            if ORDINAL_VARIANTS.contains(&c) {
                i += 1;
            } else if c == 'o' && !chars.get(i + 1).is_some_and(|n| n.is_alphabetic()) {
                i += 1;
            }
        }

        // Suffix: hyphenated ("4-A", "4 - a") or directly adjacent ("4A").
        let mut j = i;
        while chars.get(j).is_some_and(|c| *c == ' ') {
            j += 1;
        }
        let hyphenated = chars.get(j).is_some_and(|c| matches!(c, '-' | '–'));
        let start = if hyphenated {
            let mut k = j + 1;
            while chars.get(k).is_some_and(|c| *c == ' ') {
                k += 1;
            }
            Some(k)
        } else if j == i {
            Some(i)
        } else {
            None
        };

        let suffix = start.and_then(|k| {
            let letters: String = chars[k.min(chars.len())..]
                .iter()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            let adjacent_ok = hyphenated || letters.chars().all(|c| c.is_ascii_uppercase());
            if (1..=2).contains(&letters.len()) && adjacent_ok {
                Some(letters.to_ascii_uppercase())
            } else {
                None
            }
        });

        Some(Self { base, suffix })
    }

    /// Canonical string: `"4º"`, `"14"`, `"4º-A"`, `"14-A"`.
    pub fn canonical(&self) -> String {
        let mut out = if self.base < 10 {
            format!("{}{}", self.base, ORDINAL)
        } else {
            self.base.to_string()
        };
        if let Some(suffix) = &self.suffix {
            out.push('-');
            out.push_str(suffix);
        }
        out
    }

    /// Position of the letter suffix: `A..Z` → 1..26, two letters → 27..702.
    pub fn suffix_position(&self) -> i64 {
        let Some(suffix) = &self.suffix else {
            return 0;
        };
        let vals: Vec<i64> = suffix.bytes().map(|b| (b - b'A') as i64 + 1).collect();
        match vals.as_slice() {
            [a] => *a,
            [a, b] => 26 + (a - 1) * 26 + b,
            _ => 0,
        }
    }

    /// Numeric sort key: `base * 1000 + suffix_position`.
    pub fn sort_key(&self) -> i64 {
        self.base as i64 * 1000 + self.suffix_position()
    }

    /// Render the article opener followed by `body`.
    ///
    /// Ordinal articles take no trailing period (`Art. 4º Texto`), cardinal
    /// ones do (`Art. 14. Texto`). Leading separators in `body` are dropped.
    pub fn opener_with(&self, body: &str) -> String {
        let body =
            body.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '-' | '–'));
        let body = body.trim_end();
        let opener = if self.base < 10 {
            format!("Art. {}", self.canonical())
        } else {
            format!("Art. {}.", self.canonical())
        };
        if body.is_empty() {
            opener
        } else {
            format!("{opener} {body}")
        }
    }
}

impl std::fmt::Display for ArticleNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Normalise a raw numeral token straight to its canonical string.
pub fn normalize_article_number(raw: &str) -> Option<String> {
    ArticleNumber::parse(raw).map(|n| n.canonical())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted_order(inputs: &[&str]) {
        let keys: Vec<i64> = inputs
            .iter()
            .map(|s| ArticleNumber::parse(s).unwrap().sort_key())
            .collect();
        for i in 1..keys.len() {
            assert!(
                keys[i - 1] < keys[i],
                "Expected {:?} ({}) < {:?} ({})",
                inputs[i - 1],
                keys[i - 1],
                inputs[i],
                keys[i],
            );
        }
    }

    #[test]
    fn ordinal_rule() {
        assert_eq!(normalize_article_number("Art 4").as_deref(), Some("4º"));
        assert_eq!(normalize_article_number("Art. 14").as_deref(), Some("14"));
        assert_eq!(normalize_article_number("Art. 4-a").as_deref(), Some("4º-A"));
        assert_eq!(normalize_article_number("9").as_deref(), Some("9º"));
        assert_eq!(normalize_article_number("10").as_deref(), Some("10"));
    }

    #[test]
    fn ordinal_glyph_variants() {
        for raw in ["1º", "1°", "1o", "1ᵒ", "1˚"] {
            assert_eq!(normalize_article_number(raw).as_deref(), Some("1º"), "{raw}");
        }
        assert_eq!(normalize_article_number("12º").as_deref(), Some("12"));
    }

    #[test]
    fn suffix_forms() {
        assert_eq!(normalize_article_number("4º-A").as_deref(), Some("4º-A"));
        assert_eq!(normalize_article_number("14 - b").as_deref(), Some("14-B"));
        assert_eq!(normalize_article_number("14A").as_deref(), Some("14-A"));
        assert_eq!(normalize_article_number("14-AB").as_deref(), Some("14-AB"));
    }

    #[test]
    fn following_words_are_not_suffixes() {
        assert_eq!(normalize_article_number("5 A lei").as_deref(), Some("5º"));
        assert_eq!(normalize_article_number("10. Esta").as_deref(), Some("10"));
        assert_eq!(normalize_article_number("3o Os").as_deref(), Some("3º"));
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(normalize_article_number("Art. 1.025").as_deref(), Some("1025"));
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(ArticleNumber::parse("").is_none());
        assert!(ArticleNumber::parse("Art. único").is_none());
        assert!(ArticleNumber::parse("0").is_none());
    }

    #[test]
    fn sort_keys() {
        assert_eq!(ArticleNumber::parse("14").unwrap().sort_key(), 14_000);
        assert_eq!(ArticleNumber::parse("14-A").unwrap().sort_key(), 14_001);
        assert_eq!(ArticleNumber::parse("14-Z").unwrap().sort_key(), 14_026);
        assert_eq!(ArticleNumber::parse("14-AA").unwrap().sort_key(), 14_027);
        assert_eq!(ArticleNumber::parse("14-ZZ").unwrap().sort_key(), 14_702);
    }

    #[test]
    fn inserted_articles_sort_between_neighbours() {
        assert_sorted_order(&["4", "4-A", "4-B", "5", "14", "14-A", "14-AA", "15", "100"]);
    }

    #[test]
    fn opener_rendering() {
        let four = ArticleNumber::parse("4").unwrap();
        assert_eq!(four.opener_with(" - Texto."), "Art. 4º Texto.");
        let ten = ArticleNumber::parse("10").unwrap();
        assert_eq!(ten.opener_with(". Texto."), "Art. 10. Texto.");
        assert_eq!(ten.opener_with(""), "Art. 10.");
        let ins = ArticleNumber::parse("14-a").unwrap();
        assert_eq!(ins.opener_with("(VETADO)"), "Art. 14-A. (VETADO)");
    }
}
