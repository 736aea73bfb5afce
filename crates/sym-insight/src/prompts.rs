//! Prompt templates and the text renderings they embed.

use sym_core::types::UnitSentimentCount;
use sym_vector::SemanticHit;

/// One `unidade=<u>, sentimento=<s>, total=<n>` line per aggregate row.
/// Missing unit or sentiment renders as `-`.
pub fn render_summary(rows: &[UnitSentimentCount]) -> String {
    if rows.is_empty() {
        return "(nenhum comentário registrado)".to_string();
    }
    rows.iter()
        .map(|row| {
            format!(
                "unidade={}, sentimento={}, total={}",
                row.unit.as_deref().unwrap_or("-"),
                row.sentiment.map(|s| s.as_str()).unwrap_or("-"),
                row.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `- <comment>` line per retained hit.
pub fn render_examples(hits: &[SemanticHit]) -> String {
    if hits.is_empty() {
        return "(nenhum exemplo relevante encontrado)".to_string();
    }
    hits.iter()
        .map(|hit| format!("- {}", hit.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn goals_prompt(goal: &str, summary: &str) -> String {
    format!(
        "Metas da empresa: {}\n\nResumo dos comentários por unidade: {}\n\nAnalise se as metas foram atingidas com base nos comentários. Gere uma resposta formal.",
        goal, summary
    )
}

pub fn market_prompt(summary: &str, examples: &str) -> String {
    format!(
        "Analise os seguintes comentários por unidade: {}\n\nCompare com os seguintes exemplos do banco vetorial: {}\n\nApresente tendências e insights do mercado.",
        summary, examples
    )
}
