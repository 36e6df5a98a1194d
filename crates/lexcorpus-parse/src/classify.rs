//! Line classification for normalised statute text.
//!
//! Every line is tested against a fixed dispatch table of classifiers in
//! priority order; the first match wins. Context (which classes are honoured
//! where) is the segmenter's job, not this module's.

use std::sync::LazyLock;

use regex::Regex;

use lexcorpus_core::ArticleNumber;

use crate::cleanup::is_veto_line;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:lei(?:\s+complementar|\s+delegada)?|decreto(?:-lei|\s+legislativo)?|medida\s+provis[óo]ria|emenda\s+constitucional|resolu[çc][ãa]o|instru[çc][ãa]o\s+normativa|portaria)\s+n[º°o.]*\s*[\d.]+|constitui[çc][ãa]o\s+da\s+rep[úu]blica)",
    )
    .unwrap()
});
static EMENTA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Dispõe|Institui|Altera|Estabelece|Regulamenta|Cria|Autoriza|Aprova|Define|Acrescenta|Revoga|Modifica|Denomina|Declara|Concede|Abre|Torna|Ratifica|Promulga|Inscreve|Reconhece|Inclui|Disciplina|Fixa|Organiza|Consolida|Reorganiza|Transforma|Extingue|Prorroga|Dá nova redação)\b",
    )
    .unwrap()
});
static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:O|A) PRESIDENT[EA] DA REPÚBLICA|O VICE-PRESIDENTE DA REPÚBLICA|O CONGRESSO NACIONAL|O PRESIDENTE DO SENADO FEDERAL|A MESA DA CÂMARA DOS DEPUTADOS|(?i:faço saber)|Nós, representantes do povo brasileiro)",
    )
    .unwrap()
});
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:livro|parte|t[íi]tulo|cap[íi]tulo|se[çc][ãa]o|subse[çc][ãa]o)\s+(?:[IVXLCDM]+(?:-[A-Z])?\b|(?i:[úu]nic[oa]|geral|especial)\b)",
    )
    .unwrap()
});
static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Art\.?\s*(?:\d{1,3}(?:\.\d{3})+|\d+)(?:\s?[º°ᵒ˚]|o\b)?(?:[-–][A-Za-z]{1,2}\b|[A-Z]{1,2}\b)?",
    )
    .unwrap()
});
static CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-ZÀ-Ý][a-zà-ÿ]+(?:\s+(?:d[aeo]s?\s+)?[A-ZÀ-Ý][a-zà-ÿ]+)*\s*,\s*(?:em\s+)?\d{1,2}º?\s+de\s+[a-zç]+\s+de\s+\d{4}",
    )
    .unwrap()
});
static NOTICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^este\s+texto\s+n[ãa]o\s+substitui").unwrap());
static NOTICE_CONT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:o\s+)?publicad[oa]\s+no|(?:no\s+)?d\.?o\.?u\.?\b|di[áa]rio\s+oficial)")
        .unwrap()
});
static ENUM_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[IVXLC]+\s*[-–—]|[a-z]\))").unwrap());
static UNDERLINED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^_+[^_]+_+$").unwrap());

const NAME_CONNECTORS: &[&str] = &["de", "da", "do", "das", "dos", "e"];

/// Classification of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Title,
    Ementa,
    Preamble,
    Heading,
    /// All-caps descriptive heading ("DAS DISPOSIÇÕES GERAIS").
    SubHeading,
    /// Article opener with the parsed number and the text after it.
    Article { number: ArticleNumber, body: String },
    VetoMarker,
    /// Date and place line closing the statute.
    Closing,
    Notice,
    NoticeContinuation,
    Signatory,
    Text,
}

type Classifier = fn(&str) -> Option<LineClass>;

/// Classifiers in priority order.
const CLASSIFIERS: &[Classifier] = &[
    |l| TITLE_RE.is_match(l).then_some(LineClass::Title),
    |l| EMENTA_RE.is_match(l).then_some(LineClass::Ementa),
    |l| PREAMBLE_RE.is_match(l).then_some(LineClass::Preamble),
    |l| HEADING_RE.is_match(l).then_some(LineClass::Heading),
    |l| is_sub_heading(l).then_some(LineClass::SubHeading),
    classify_article,
    |l| is_veto_line(l).then_some(LineClass::VetoMarker),
    |l| CLOSING_RE.is_match(l).then_some(LineClass::Closing),
    |l| NOTICE_RE.is_match(l).then_some(LineClass::Notice),
    |l| NOTICE_CONT_RE.is_match(l).then_some(LineClass::NoticeContinuation),
    |l| is_signatory(l).then_some(LineClass::Signatory),
];

/// Classify one trimmed line.
pub fn classify_line(line: &str) -> LineClass {
    let line = line.trim();
    CLASSIFIERS
        .iter()
        .find_map(|classify| classify(line))
        .unwrap_or(LineClass::Text)
}

fn classify_article(line: &str) -> Option<LineClass> {
    let m = ARTICLE_RE.find(line)?;
    let number = ArticleNumber::parse(m.as_str())?;
    Some(LineClass::Article {
        number,
        body: line[m.end()..].to_string(),
    })
}

/// Return the text after a leading `Art. N` opener, if there is one.
pub fn strip_article_opener(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let m = ARTICLE_RE.find(trimmed)?;
    Some(&trimmed[m.end()..])
}

/// Whether `line` starts with a structural heading keyword and numeral.
pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line.trim())
}

fn is_sub_heading(line: &str) -> bool {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    line.chars().count() <= 150
        && letters.len() >= 4
        && letters.iter().all(|c| !c.is_lowercase())
        && !line.chars().any(|c| c.is_ascii_digit() || matches!(c, '(' | ')' | '§' | '“' | '"'))
        && !line.ends_with([';', ':', ','])
        && !ENUM_START_RE.is_match(line)
        && !line.starts_with("Art")
}

fn is_signatory(line: &str) -> bool {
    if UNDERLINED_RE.is_match(line) {
        return true;
    }
    if line.chars().count() > 80
        || line.chars().any(|c| c.is_ascii_digit())
        || line.ends_with(['.', ';', ':', ','])
    {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    words.len() >= 2
        && words.iter().all(|w| {
            NAME_CONNECTORS.contains(w)
                || w.chars().next().is_some_and(|c| c.is_uppercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(line: &str) -> (String, String) {
        match classify_line(line) {
            LineClass::Article { number, body } => (number.canonical(), body),
            other => panic!("expected article, got {other:?}"),
        }
    }

    #[test]
    fn classifies_preliminary_elements() {
        assert_eq!(
            classify_line("LEI Nº 8.078, DE 11 DE SETEMBRO DE 1990."),
            LineClass::Title
        );
        assert_eq!(
            classify_line("Dispõe sobre a proteção do consumidor e dá outras providências."),
            LineClass::Ementa
        );
        assert_eq!(
            classify_line("O PRESIDENTE DA REPÚBLICA, faço saber que o Congresso Nacional decreta:"),
            LineClass::Preamble
        );
    }

    #[test]
    fn classifies_headings() {
        assert_eq!(classify_line("CAPÍTULO II DOS DIREITOS"), LineClass::Heading);
        assert_eq!(classify_line("Seção I Das Disposições Gerais"), LineClass::Heading);
        assert_eq!(classify_line("TÍTULO ÚNICO"), LineClass::Heading);
        assert_eq!(classify_line("PARTE GERAL"), LineClass::Heading);
        assert_eq!(classify_line("DAS DISPOSIÇÕES FINAIS"), LineClass::SubHeading);
        assert_ne!(classify_line("Capítulo do livro"), LineClass::Heading);
    }

    #[test]
    fn classifies_article_openers() {
        assert_eq!(
            article("Art. 1º Esta Lei estabelece normas."),
            ("1º".into(), " Esta Lei estabelece normas.".into())
        );
        assert_eq!(article("Art. 10. A lei dispõe.").0, "10");
        assert_eq!(article("Art 4 Texto").0, "4º");
        assert_eq!(article("Art. 4-a Texto").0, "4º-A");
        assert_eq!(article("Art. 14-A. Texto").0, "14-A");
        assert_eq!(article("Art. 1o A União").0, "1º");
        assert_eq!(article("Art. 1.025. Texto").0, "1025");
    }

    #[test]
    fn old_style_dash_is_not_a_suffix() {
        let (num, body) = article("Art. 1º - A União, os Estados e os Municípios");
        assert_eq!(num, "1º");
        assert!(body.contains("A União"));
    }

    #[test]
    fn lowercase_reference_is_text() {
        assert_eq!(classify_line("art. 5º da Lei nº 8.666"), LineClass::Text);
    }

    #[test]
    fn classifies_closing_block() {
        assert_eq!(
            classify_line("Brasília, 11 de setembro de 1990; 169º da Independência e 102º da República."),
            LineClass::Closing
        );
        assert_eq!(
            classify_line("Rio de Janeiro, 7 de dezembro de 1940"),
            LineClass::Closing
        );
        assert_eq!(
            classify_line("Este texto não substitui o publicado no DOU de 12.9.1990"),
            LineClass::Notice
        );
        assert_eq!(
            classify_line("publicado no DOU de 12.9.1990, retificado em 10.1.2007"),
            LineClass::NoticeContinuation
        );
        assert_eq!(classify_line("Bernardo Cabral"), LineClass::Signatory);
        assert_eq!(classify_line("Zélia M. Cardoso de Mello"), LineClass::Signatory);
        assert_eq!(classify_line("_Fulano de Tal_"), LineClass::Signatory);
        assert_eq!(classify_line("FERNANDO COLLOR"), LineClass::SubHeading);
    }

    #[test]
    fn body_text_is_text() {
        assert_eq!(classify_line("I - legislar sobre direito civil;"), LineClass::Text);
        assert_eq!(classify_line("§ 1º O disposto neste artigo."), LineClass::Text);
        assert_eq!(classify_line("(VETADO)"), LineClass::VetoMarker);
    }

    #[test]
    fn strips_opener() {
        assert_eq!(strip_article_opener("Art. 12 - Texto"), Some(" - Texto"));
        assert_eq!(strip_article_opener("Texto"), None);
    }
}
