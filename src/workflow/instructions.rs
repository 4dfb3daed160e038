//! Instruction text handed to the transient assistants.
//!
//! The extraction prompt pins the fichamento JSON contract; the search prompt
//! folds the advisory filters in as natural-language hints. Neither is
//! enforced structurally by the gateway, which is why replies are re-validated
//! after parsing.

use crate::schema::SearchFilters;

/// Instructions for the metadata-extraction assistant.
pub fn extraction_instructions() -> &'static str {
    r#"Você é um assistente especializado em fichamento de artigos científicos e médicos.
Analise o documento indicado e responda SOMENTE com um objeto JSON, sem texto adicional, no formato:
{
  "identificacao": {
    "doi": string (opcional),
    "titulo": string,
    "ano": number,
    "autores": [string] (opcional, "Sobrenome, Iniciais"),
    "periodico": string (opcional),
    "tipo_estudo": "RCT" | "Cohort" | "Case-control" | "Cross-sectional" | "Systematic Review" | "Meta-analysis" | "Case series" | "Other" (opcional),
    "area_tema": [string] (opcional)
  },
  "metodos": { "populacao", "intervencoes", "comparadores", "desfechos", "duracao", "n" } (opcional),
  "resultados": { "efeito_principal", "medidas_efeito": [string], "estatisticas": [string] } (opcional),
  "seguranca": { "eventos_adversos", "limitacoes", "risco_sesgo" } (opcional),
  "conclusao_clinica": string,
  "resumo_teleprompter": string,
  "referencias": [string] (opcional)
}
Campos opcionais devem ser omitidos quando a informação não estiver no documento."#
}

/// User turn asking the extraction assistant to analyze one file.
pub fn extraction_user_message(file_name: &str) -> String {
    format!(
        "Analise o arquivo \"{file_name}\" anexado ao índice e produza o fichamento em JSON."
    )
}

/// Instructions for the search assistant, embedding filters as hints.
pub fn search_instructions(filters: Option<&SearchFilters>) -> String {
    let mut instructions = String::from(
        "Você é um assistente de pesquisa especializado em documentos científicos e médicos. \
         Responda objetivamente em bullets, destacando os trechos mais relevantes.",
    );

    if let Some(filters) = filters.filter(|filters| !filters.is_empty()) {
        instructions.push_str("\n\nFiltros aplicados:");
        if let Some(ano) = &filters.ano {
            instructions.push_str(&format!("\n- Ano: {ano}"));
        }
        if let Some(tema) = &filters.tema {
            instructions.push_str(&format!("\n- Tema: {tema}"));
        }
        if let Some(tipo_estudo) = &filters.tipo_estudo {
            instructions.push_str(&format!("\n- Tipo de estudo: {tipo_estudo}"));
        }
    }

    instructions
}
