//! Defensive parsing of loosely formatted JSON in model output.

use serde::de::DeserializeOwned;

/// Drop a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// The outermost `{ ... }` span of `text`.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a JSON object out of model output: fenced, prefixed with prose, or
/// trailed by commentary. `None` when no well-formed object of type `T` is
/// found.
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> Option<T> {
    let body = strip_code_fence(text);
    if let Ok(v) = serde_json::from_str(body) {
        return Some(v);
    }
    serde_json::from_str(object_span(body)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        a: u32,
    }

    #[test]
    fn parses_plain_and_fenced() {
        assert_eq!(parse_lenient::<Sample>(r#"{"a":1}"#), Some(Sample { a: 1 }));
        assert_eq!(
            parse_lenient::<Sample>("```json\n{\"a\":2}\n```"),
            Some(Sample { a: 2 })
        );
    }

    #[test]
    fn salvages_object_from_prose() {
        assert_eq!(
            parse_lenient::<Sample>("Segue o resultado: {\"a\":3} espero ter ajudado"),
            Some(Sample { a: 3 })
        );
    }

    #[test]
    fn rejects_wrong_shape() {
        assert_eq!(parse_lenient::<Sample>("{\"b\":1}"), None);
        assert_eq!(parse_lenient::<Sample>("sem json"), None);
        assert_eq!(parse_lenient::<Sample>("{\"a\":"), None);
    }

    #[test]
    fn fence_without_language() {
        assert_eq!(strip_code_fence("```\ntexto\n```"), "texto");
        assert_eq!(strip_code_fence("texto"), "texto");
    }
}
