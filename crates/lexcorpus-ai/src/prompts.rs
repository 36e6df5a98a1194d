//! Prompt templates for every AI task in the pipeline.

use std::fmt::Write;

use lexcorpus_core::{ArticleNumber, GapInterval};

// ── Whole-text cleanup ──

pub const CLEANUP_PROMPT: &str = "\
Você revisa a formatação de textos legais brasileiros extraídos de páginas web.

Corrija APENAS as quebras de linha: cada artigo (\"Art. N\"), parágrafo (\"§ N\", \
\"Parágrafo único\"), inciso (\"I -\"), alínea (\"a)\") e título de divisão (LIVRO, \
TÍTULO, CAPÍTULO, SEÇÃO) deve começar em uma linha própria.

Não resuma, não reescreva, não traduza e não remova nenhum trecho. \
Responda somente com o texto corrigido, sem comentários e sem blocos de código.

TEXTO:
";

pub fn build_cleanup_prompt(text: &str) -> String {
    format!("{CLEANUP_PROMPT}{text}")
}

// ── Article repair ──

pub const REPAIR_PROMPT: &str = "\
Você corrige artigos de uma lei brasileira que foram extraídos com defeitos \
(texto truncado, marcador de veto deslocado, citações de alteração residuais, \
incisos vazios).

Use o TEXTO FONTE como referência. Para cada artigo, devolva o texto completo e \
correto, começando por \"Art. N\". Mantenha apenas os marcadores (VETADO) e \
(Revogado); remova citações como \"(Incluído pela Lei nº ...)\" ou \
\"(Redação dada pela Lei nº ...)\".

Responda SOMENTE com JSON, sem blocos de código:
{\"articles\": [{\"number\": \"5º\", \"text\": \"Art. 5º ...\", \"note\": \"o que foi corrigido\"}]}";

pub fn build_repair_prompt(
    articles: &[(String, String, Vec<&'static str>)],
    source: &str,
) -> String {
    let mut out = String::from(REPAIR_PROMPT);
    out.push_str("\n\nARTIGOS COM PROBLEMAS:\n");
    for (number, text, flags) in articles {
        let _ = write!(out, "\n--- Art. {number} [{}]\n{text}\n", flags.join(", "));
    }
    let _ = write!(out, "\nTEXTO FONTE:\n{source}");
    out
}

// ── Gap completion ──

pub const COMPLETION_PROMPT: &str = "\
Você localiza artigos ausentes de uma lei brasileira.

Procure no TEXTO FONTE os artigos listados em ARTIGOS AUSENTES. Para cada um \
encontrado, devolva o texto integral começando por \"Art. N\" e o status \
\"normal\", \"revogado\" ou \"vetado\". Não invente texto: se um artigo não \
aparece na fonte, liste o número em \"not_found\".

Responda SOMENTE com JSON, sem blocos de código:
{\"found\": {\"4\": {\"text\": \"Art. 4º ...\", \"status\": \"normal\"}}, \"not_found\": [7]}";

pub fn build_completion_prompt(title: Option<&str>, missing: &[u32], source: &str) -> String {
    let list = missing
        .iter()
        .map(|n| ArticleNumber::new(*n).canonical())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{COMPLETION_PROMPT}\n\nLEI: {title}\nARTIGOS AUSENTES: {list}\n\nTEXTO FONTE:\n{source}",
        title = title.unwrap_or("(desconhecida)"),
    )
}

// ── Gap explanation ──

pub const EXPLANATION_PROMPT: &str = "\
Você explica lacunas na numeração de artigos de uma lei brasileira.

Para cada intervalo em LACUNAS, classifique a causa mais provável como \
\"repealed\" (revogado), \"vetoed\" (vetado), \"unregulated\" (não \
regulamentado) ou \"not_found\" (não encontrado na fonte) e dê um motivo curto. \
Depois escreva um resumo geral de uma ou duas frases.

Responda SOMENTE com JSON, sem blocos de código:
{\"gaps\": [{\"from\": 7, \"to\": 7, \"kind\": \"not_found\", \"reason\": \"...\"}], \"summary\": \"...\"}";

pub fn build_explanation_prompt(title: Option<&str>, gaps: &[GapInterval], source: &str) -> String {
    let mut out = String::from(EXPLANATION_PROMPT);
    let _ = write!(out, "\n\nLEI: {}\nLACUNAS:\n", title.unwrap_or("(desconhecida)"));
    for g in gaps {
        let _ = writeln!(out, "- de {} a {} ({} artigos)", g.from, g.to, g.count);
    }
    let _ = write!(out, "\nTEXTO FONTE:\n{source}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_prompt_lists_canonical_numbers() {
        let p = build_completion_prompt(Some("LEI Nº 1"), &[4, 12], "fonte");
        assert!(p.contains("ARTIGOS AUSENTES: 4º, 12"));
        assert!(p.contains("LEI: LEI Nº 1"));
        assert!(p.ends_with("fonte"));
    }

    #[test]
    fn explanation_prompt_lists_intervals() {
        let p = build_explanation_prompt(None, &[GapInterval::new(7, 9)], "");
        assert!(p.contains("- de 7 a 9 (3 artigos)"));
        assert!(p.contains("(desconhecida)"));
    }

    #[test]
    fn repair_prompt_includes_flags() {
        let p = build_repair_prompt(
            &[("5º".into(), "Art. 5º texto".into(), vec!["truncated"])],
            "fonte",
        );
        assert!(p.contains("--- Art. 5º [truncated]\nArt. 5º texto"));
    }
}
