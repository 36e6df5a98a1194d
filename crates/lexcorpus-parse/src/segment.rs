//! Finite-state segmenter: normalised statute text in, ordered records out.
//!
//! The segmenter is a value carried through a fold over lines. Each
//! [`Segmenter::step`] consumes one line and returns the next state plus at
//! most one finished record; [`Segmenter::finish`] flushes the last unit.

use tracing::debug;

use lexcorpus_core::record::CLOSING_BASE;
use lexcorpus_core::{ArticleNumber, ArticleRecord, GuardPolicy, RecordKind, sort_records};

use crate::classify::{LineClass, classify_line};
use crate::cleanup::{render_article_body, strip_citations};
use crate::guard::{QuoteTracker, is_amendment_intro, is_outlier_jump};

/// Named segmenter phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing recognised yet; lines become a header record.
    Start,
    Title,
    Ementa,
    Preamble,
    HeadingAccum,
    InArticle,
    /// Inside an amending clause that quotes another statute.
    QuotedAmendment(QuoteTracker),
    /// Closing date line, signatures and publication notice.
    Footer,
}

/// The unit currently being accumulated.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    None,
    Element {
        kind: RecordKind,
        order: i64,
        lines: Vec<String>,
    },
    Article {
        number: ArticleNumber,
        lines: Vec<String>,
    },
}

impl Pending {
    fn push(&mut self, line: &str) {
        match self {
            Pending::Element { lines, .. } | Pending::Article { lines, .. } => {
                lines.push(line.to_string())
            }
            Pending::None => {}
        }
    }

    fn kind(&self) -> Option<RecordKind> {
        match self {
            Pending::Element { kind, .. } => Some(*kind),
            Pending::Article { .. } => Some(RecordKind::Article),
            Pending::None => None,
        }
    }

    fn into_record(self) -> Option<ArticleRecord> {
        match self {
            Pending::None => None,
            Pending::Article { number, lines } => {
                Some(ArticleRecord::article(&number, &render_article_body(&lines)))
            }
            Pending::Element { kind, order, lines } => {
                let sep = match kind {
                    RecordKind::Title
                    | RecordKind::Ementa
                    | RecordKind::Preamble
                    | RecordKind::Notice => " ",
                    _ => "\n",
                };
                let text = strip_citations(&lines.join(sep));
                (!text.is_empty()).then(|| ArticleRecord::element(kind, text, order))
            }
        }
    }
}

/// Segmenter state carried through the line fold.
#[derive(Debug, Clone)]
pub struct Segmenter {
    phase: Phase,
    pending: Pending,
    policy: GuardPolicy,
    /// Distinct base numbers accepted so far, in acceptance order.
    accepted: Vec<u32>,
    /// Sort key of the last accepted article (0 before the first).
    last_key: i64,
    /// Base number of the last candidate folded as an outlier jump.
    rejected: Option<u32>,
    leading_seq: i64,
    closing_seq: i64,
}

impl Segmenter {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            phase: Phase::Start,
            pending: Pending::None,
            policy,
            accepted: Vec::new(),
            last_key: 0,
            rejected: None,
            leading_seq: 0,
            closing_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consume one line.
    pub fn step(mut self, line: &str) -> (Self, Option<ArticleRecord>) {
        let line = line.trim();
        if line.is_empty() {
            return (self, None);
        }
        let class = classify_line(line);

        if let Phase::QuotedAmendment(tracker) = self.phase {
            // Without quotes the block has no closing mark, so the next
            // in-sequence opener or a structural heading ends it.
            let resumes = !tracker.seen_quote()
                && match &class {
                    LineClass::Article { number, .. } => self.is_next_in_sequence(number),
                    LineClass::Heading => true,
                    _ => false,
                };
            if !resumes {
                self.pending.push(line);
                self.phase = match tracker.observe(line, &self.policy) {
                    Some(t) => Phase::QuotedAmendment(t),
                    None => Phase::InArticle,
                };
                return (self, None);
            }
            self.phase = Phase::InArticle;
        }

        match class {
            LineClass::Article { number, body } => self.on_article(line, number, &body),
            LineClass::Signatory
            | LineClass::SubHeading
            | LineClass::Text
            | LineClass::NoticeContinuation
                if self.phase == Phase::Footer =>
            {
                match self.pending.kind() {
                    Some(RecordKind::Signature | RecordKind::Notice) => self.append(line),
                    _ => self.begin(RecordKind::Signature, Phase::Footer, line),
                }
            }
            LineClass::Heading | LineClass::SubHeading => self.on_heading(line),
            LineClass::Title if self.phase == Phase::Start => {
                self.begin(RecordKind::Title, Phase::Title, line)
            }
            LineClass::Ementa if matches!(self.phase, Phase::Start | Phase::Title) => {
                self.begin(RecordKind::Ementa, Phase::Ementa, line)
            }
            LineClass::Preamble
                if matches!(self.phase, Phase::Start | Phase::Title | Phase::Ementa) =>
            {
                self.begin(RecordKind::Preamble, Phase::Preamble, line)
            }
            LineClass::Closing if self.has_articles() => {
                self.begin(RecordKind::Closing, Phase::Footer, line)
            }
            LineClass::Notice => {
                let phase = if self.has_articles() { Phase::Footer } else { self.phase };
                self.begin(RecordKind::Notice, phase, line)
            }
            LineClass::NoticeContinuation if self.pending.kind() == Some(RecordKind::Notice) => {
                self.append(line)
            }
            _ => self.append(line),
        }
    }

    /// Flush the unit still being accumulated.
    pub fn finish(self) -> Option<ArticleRecord> {
        self.pending.into_record()
    }

    fn has_articles(&self) -> bool {
        !self.accepted.is_empty()
    }

    fn is_next_in_sequence(&self, number: &ArticleNumber) -> bool {
        let last = self.accepted.last().copied().unwrap_or(0);
        number.sort_key() > self.last_key
            && (number.base == last + 1 || (number.base == last && number.suffix.is_some()))
    }

    fn admits(&self, number: &ArticleNumber) -> bool {
        if number.sort_key() <= self.last_key {
            return false;
        }
        if self.rejected.is_some_and(|r| number.base == r + 1) {
            return true;
        }
        !is_outlier_jump(number.base, &self.accepted, &self.policy)
    }

    fn on_article(
        mut self,
        line: &str,
        number: ArticleNumber,
        body: &str,
    ) -> (Self, Option<ArticleRecord>) {
        if !self.admits(&number) {
            if number.sort_key() > self.last_key {
                debug!(number = %number, "folding outlier article reference");
                self.rejected = Some(number.base);
            } else {
                debug!(number = %number, "folding repeated article number");
            }
            return self.append(line);
        }

        if self.accepted.last() != Some(&number.base) {
            self.accepted.push(number.base);
        }
        self.last_key = number.sort_key();
        self.rejected = None;

        let emitted = std::mem::replace(
            &mut self.pending,
            Pending::Article {
                number,
                lines: vec![body.to_string()],
            },
        )
        .into_record();
        self.phase = Phase::InArticle;
        self.enter_quote_if_amending(body);
        (self, emitted)
    }

    fn on_heading(self, line: &str) -> (Self, Option<ArticleRecord>) {
        match self.phase {
            Phase::HeadingAccum => self.append(line),
            Phase::Footer => self.append(line),
            _ => self.begin(RecordKind::Heading, Phase::HeadingAccum, line),
        }
    }

    /// Emit the pending unit and start a new element of `kind`.
    fn begin(
        mut self,
        kind: RecordKind,
        phase: Phase,
        line: &str,
    ) -> (Self, Option<ArticleRecord>) {
        let order = self.next_order(kind);
        let emitted = std::mem::replace(
            &mut self.pending,
            Pending::Element {
                kind,
                order,
                lines: vec![line.to_string()],
            },
        )
        .into_record();
        self.phase = phase;
        (self, emitted)
    }

    /// Append to the pending unit, opening a header record if there is none.
    fn append(mut self, line: &str) -> (Self, Option<ArticleRecord>) {
        if self.pending == Pending::None {
            return self.begin(RecordKind::Header, Phase::Start, line);
        }
        self.pending.push(line);
        if self.phase == Phase::InArticle {
            self.enter_quote_if_amending(line);
        }
        (self, None)
    }

    fn enter_quote_if_amending(&mut self, line: &str) {
        if is_amendment_intro(line)
            && let Some(tracker) = QuoteTracker::start(line, &self.policy)
        {
            self.phase = Phase::QuotedAmendment(tracker);
        }
    }

    fn next_order(&mut self, kind: RecordKind) -> i64 {
        match kind {
            RecordKind::Closing | RecordKind::Signature => {
                self.closing_seq += 1;
                CLOSING_BASE + self.closing_seq
            }
            RecordKind::Notice if self.has_articles() => {
                self.closing_seq += 1;
                CLOSING_BASE + self.closing_seq
            }
            // Sorts right after the article it follows.
            RecordKind::Heading if self.has_articles() => self.last_key,
            _ => {
                self.leading_seq += 1;
                self.leading_seq
            }
        }
    }
}

/// Segment normalised text into ordered records.
pub fn segment(text: &str, policy: &GuardPolicy) -> Vec<ArticleRecord> {
    let mut records = Vec::new();
    let state = text
        .lines()
        .fold(Segmenter::new(policy.clone()), |state, line| {
            let (next, emitted) = state.step(line);
            records.extend(emitted);
            next
        });
    records.extend(state.finish());
    sort_records(&mut records);
    debug!(
        records = records.len(),
        articles = records.iter().filter(|r| r.is_article()).count(),
        "segmented text"
    );
    records
}

/// Fold article records whose base number is in `discarded` into the
/// preceding article's text.
pub fn absorb_outliers(records: Vec<ArticleRecord>, discarded: &[u32]) -> Vec<ArticleRecord> {
    if discarded.is_empty() {
        return records;
    }
    let mut out: Vec<ArticleRecord> = Vec::with_capacity(records.len());
    for record in records {
        let is_outlier = record
            .base_number()
            .is_some_and(|b| record.is_article() && discarded.contains(&b));
        if is_outlier && let Some(prev) = out.iter_mut().rev().find(|r| r.is_article()) {
            prev.text.push('\n');
            prev.text.push_str(&record.text);
            continue;
        }
        out.push(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize_html;
    use lexcorpus_core::{OutlierPolicy, analyze};

    fn seg(text: &str) -> Vec<ArticleRecord> {
        segment(text, &GuardPolicy::default())
    }

    fn numbers(records: &[ArticleRecord]) -> Vec<String> {
        records
            .iter()
            .filter(|r| r.is_article())
            .filter_map(|r| r.number.clone())
            .collect()
    }

    const STATUTE: &str = "\
LEI Nº 1.234, DE 5 DE MAIO DE 2001.
Dispõe sobre a organização de testes.
O PRESIDENTE DA REPÚBLICA Faço saber que o Congresso Nacional decreta e eu sanciono a seguinte Lei:
CAPÍTULO I
DAS DISPOSIÇÕES GERAIS
Art. 1º Esta Lei estabelece normas.
Art. 2º Compete à União:
I - legislar;
II - executar.
Parágrafo único. O disposto neste artigo.
CAPÍTULO II
Art. 3º (VETADO)
Art. 4 Esta Lei entra em vigor na data de sua publicação.
Brasília, 5 de maio de 2001; 180º da Independência e 113º da República.
FULANO DE TAL
Beltrano de Souza
Este texto não substitui o publicado no DOU de 6.5.2001";

    #[test]
    fn segments_full_statute() {
        let recs = seg(STATUTE);
        let kinds: Vec<RecordKind> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Title,
                RecordKind::Ementa,
                RecordKind::Preamble,
                RecordKind::Heading,
                RecordKind::Article,
                RecordKind::Article,
                RecordKind::Heading,
                RecordKind::Article,
                RecordKind::Article,
                RecordKind::Closing,
                RecordKind::Signature,
                RecordKind::Notice,
            ]
        );
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º", "4º"]);
        assert_eq!(recs[3].text, "CAPÍTULO I\nDAS DISPOSIÇÕES GERAIS");
        assert_eq!(
            recs[5].text,
            "Art. 2º Compete à União:\n\nI - legislar;\n\nII - executar.\n\nParágrafo único. O disposto neste artigo."
        );
        assert_eq!(recs[7].text, "Art. 3º (VETADO)");
        assert_eq!(recs[10].text, "FULANO DE TAL\nBeltrano de Souza");
    }

    #[test]
    fn orders_follow_source() {
        let recs = seg(STATUTE);
        assert!(recs.windows(2).all(|w| w[0].order <= w[1].order));
        let heading_two = &recs[6];
        assert_eq!(heading_two.order, recs[5].order);
        assert_eq!(recs[9].order, CLOSING_BASE + 1);
    }

    #[test]
    fn n_openers_give_n_articles() {
        let text: String = (1..=25)
            .map(|k| format!("Art. {k} Texto do artigo {k}."))
            .collect::<Vec<_>>()
            .join("\n");
        let recs = seg(&text);
        let expected: Vec<String> = (1..=25)
            .map(|k| ArticleNumber::new(k).canonical())
            .collect();
        assert_eq!(numbers(&recs), expected);
        assert!(recs.iter().all(|r| r.is_article()));
    }

    #[test]
    fn suffixed_articles_sort_between() {
        let recs = seg("Art. 14. A.\nArt. 14-A. B.\nArt. 15. C.");
        assert_eq!(numbers(&recs), vec!["14", "14-A", "15"]);
    }

    #[test]
    fn inserted_chapter_precedes_its_suffixed_article() {
        let text = "Art. 14. A.\nCAPÍTULO IV-A\nDO REGIME ESPECIAL\nArt. 14-A. B.\nArt. 15. C.";
        let recs = seg(text);
        let kinds: Vec<RecordKind> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Article,
                RecordKind::Heading,
                RecordKind::Article,
                RecordKind::Article,
            ]
        );
        assert_eq!(numbers(&recs), vec!["14", "14-A", "15"]);
    }

    #[test]
    fn quoted_amendment_is_not_captured() {
        let text = "\
Art. 1º Esta Lei altera a Lei nº 8.112.
Art. 2º O art. 5º da Lei nº 8.112, de 1990, passa a vigorar com a seguinte redação:
“Art. 5º São requisitos básicos:
I - a nacionalidade brasileira;
II - o gozo dos direitos políticos.” (NR)
Art. 3º Esta Lei entra em vigor na data de sua publicação.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º"]);
        assert!(recs[1].text.contains("“Art. 5º São requisitos básicos:"));
    }

    #[test]
    fn unquoted_amendment_folds_foreign_openers() {
        let text = "\
Art. 1º Objeto.
Art. 2º A Lei nº 9.099 passa a vigorar com as seguintes alterações:
Art. 60. O Juizado Especial Criminal.
Art. 61. Consideram-se infrações.
Art. 3º Vigência.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º"]);
        assert!(recs[1].text.contains("Art. 61. Consideram-se"));
    }

    #[test]
    fn heading_ends_unquoted_amendment() {
        let text = "\
Art. 1º Objeto.
Art. 2º O art. 5º da Lei nº 1, de 1990, passa a vigorar com alterações.
CAPÍTULO II
DAS DISPOSIÇÕES FINAIS
Art. 3º Vigência.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º"]);
        assert!(recs[1].text.ends_with("passa a vigorar com alterações."));
        assert!(!recs[1].text.contains("CAPÍTULO"));
        let heading = recs.iter().find(|r| r.kind == RecordKind::Heading).unwrap();
        assert_eq!(heading.text, "CAPÍTULO II\nDAS DISPOSIÇÕES FINAIS");
        let pos = recs.iter().position(|r| r.kind == RecordKind::Heading).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(heading.order, recs[1].order);
    }

    #[test]
    fn heading_inside_quoted_amendment_stays_quoted() {
        let text = "\
Art. 1º Objeto.
Art. 2º A Lei nº 9.099 passa a vigorar acrescida do seguinte art. 60-A: “Art. 60-A. Texto novo,
CAPÍTULO IV
nos termos do regulamento.”
Art. 3º Vigência.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º"]);
        assert!(recs.iter().all(|r| r.kind != RecordKind::Heading));
        assert!(recs[1].text.contains("CAPÍTULO IV"));
    }

    #[test]
    fn outlier_jump_folds_into_current_article() {
        let text = "\
Art. 1º A.
Art. 2º B.
Art. 3º C, nos termos do
Art. 612 do Código Civil.
Art. 4º D.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º", "4º"]);
        assert!(recs[2].text.contains("Art. 612 do Código Civil."));
    }

    #[test]
    fn resumed_sequence_after_jump_is_accepted() {
        let text = "Art. 1º A.\nArt. 2º B.\nArt. 40. C.\nArt. 41. D.\nArt. 42. E.";
        let recs = seg(text);
        assert_eq!(numbers(&recs), vec!["1º", "2º", "41", "42"]);
    }

    #[test]
    fn repeated_number_is_folded() {
        let recs = seg("Art. 1º A.\nArt. 2º B.\nArt. 1º repetido.\nArt. 3º C.");
        assert_eq!(numbers(&recs), vec!["1º", "2º", "3º"]);
        assert!(recs[1].text.ends_with("Art. 1º repetido."));
    }

    #[test]
    fn citations_are_stripped_from_articles() {
        let recs = seg(
            "Art. 1º Texto. (Redação dada pela Lei nº 9.876, de 1999)\n\
             Art. 2º (Revogado pela Lei nº 1, de 2000)",
        );
        assert_eq!(recs[0].text, "Art. 1º Texto.");
        assert_eq!(recs[1].text, "Art. 2º (Revogado)");
    }

    #[test]
    fn leading_text_becomes_header() {
        let recs =
            seg("Presidência da República\nCasa Civil\nLEI Nº 1, DE 2 DE JANEIRO DE 2000.\nArt. 1º A.");
        assert_eq!(recs[0].kind, RecordKind::Header);
        assert_eq!(recs[0].text, "Presidência da República\nCasa Civil");
        assert_eq!(recs[1].kind, RecordKind::Title);
    }

    #[test]
    fn html_end_to_end_with_strikethrough() {
        let html = "<p>Art. 5º <strike>revoked clause</strike> remaining text</p>";
        let recs = seg(&sanitize_html(html));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].number.as_deref(), Some("5º"));
        assert!(recs[0].text.contains("remaining text"));
        assert!(!recs[0].text.contains("revoked clause"));
    }

    #[test]
    fn absorbs_analyzer_outliers() {
        let mut recs: Vec<ArticleRecord> = (1..=49)
            .map(|n| ArticleRecord::article(&ArticleNumber::new(n), "texto."))
            .collect();
        recs.push(ArticleRecord::article(&ArticleNumber::new(612), "referência."));
        let analysis = analyze(&recs, &OutlierPolicy::default());
        let recs = absorb_outliers(recs, &analysis.discarded);
        assert_eq!(recs.len(), 49);
        assert!(recs[48].text.ends_with("Art. 612. referência."));
    }
}
