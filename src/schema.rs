//! Data contract for extracted document metadata and the search surface.
//!
//! The shapes mirror the fichamento produced by the extraction assistant:
//! an identification block plus best-effort methods/results/safety sections,
//! a required clinical conclusion, and a required teleprompter summary.
//! Deserializing the assistant's reply into these types doubles as the
//! post-parse validation step: a reply missing a required field never reaches
//! the document store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of the study design reported by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyType {
    /// Randomized controlled trial.
    #[serde(rename = "RCT")]
    Rct,
    /// Prospective or retrospective cohort study.
    Cohort,
    /// Case-control study.
    #[serde(rename = "Case-control")]
    CaseControl,
    /// Cross-sectional study.
    #[serde(rename = "Cross-sectional")]
    CrossSectional,
    /// Systematic review.
    #[serde(rename = "Systematic Review")]
    SystematicReview,
    /// Meta-analysis.
    #[serde(rename = "Meta-analysis")]
    MetaAnalysis,
    /// Case series.
    #[serde(rename = "Case series")]
    CaseSeries,
    /// Any design not covered by the other variants.
    Other,
}

/// Bibliographic identification of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentIdentification {
    /// DOI, when the assistant could locate one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Title of the work.
    pub titulo: String,
    /// Publication year.
    pub ano: i32,
    /// Author list, `"Surname, Initials"` per entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autores: Option<Vec<String>>,
    /// Journal or venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodico: Option<String>,
    /// Study design classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_estudo: Option<StudyType>,
    /// Topic tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_tema: Option<Vec<String>>,
}

/// Methods section of the fichamento. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMethods {
    /// Studied population.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populacao: Option<String>,
    /// Interventions applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervencoes: Option<String>,
    /// Comparator arms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparadores: Option<String>,
    /// Measured outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desfechos: Option<String>,
    /// Follow-up duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duracao: Option<String>,
    /// Sample size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<i64>,
}

/// Results section of the fichamento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentResults {
    /// Principal effect reported by the study.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efeito_principal: Option<String>,
    /// Effect measures (RR, OR, HR, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medidas_efeito: Option<Vec<String>>,
    /// Key statistics (confidence intervals, p-values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estatisticas: Option<Vec<String>>,
}

/// Safety section of the fichamento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSafety {
    /// Adverse events reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventos_adversos: Option<String>,
    /// Limitations acknowledged by the authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limitacoes: Option<String>,
    /// Risk-of-bias assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risco_sesgo: Option<String>,
}

/// Full fichamento extracted for one document.
///
/// `identificacao.titulo`, `identificacao.ano`, `conclusao_clinica`, and
/// `resumo_teleprompter` are required for a record to be considered complete;
/// everything else may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Bibliographic identification block.
    pub identificacao: DocumentIdentification,
    /// Methods section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metodos: Option<DocumentMethods>,
    /// Results section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resultados: Option<DocumentResults>,
    /// Safety section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seguranca: Option<DocumentSafety>,
    /// Clinical bottom line.
    pub conclusao_clinica: String,
    /// Short spoken-style summary for teleprompter use.
    pub resumo_teleprompter: String,
    /// Reference list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referencias: Option<Vec<String>>,
}

/// Errors produced while turning assistant output into a [`DocumentMetadata`].
#[derive(Debug, Error)]
pub enum MetadataParseError {
    /// Reply was not valid JSON or did not match the contract.
    #[error("metadata does not match the expected contract: {0}")]
    Contract(#[from] serde_json::Error),
    /// Required text field deserialized to an empty string.
    #[error("required metadata field '{0}' is empty")]
    EmptyField(&'static str),
}

/// Parse an assistant reply into validated metadata.
///
/// Assistants routinely wrap JSON replies in Markdown code fences; those are
/// stripped before parsing. Replies that parse but leave a required text
/// field empty are rejected rather than persisted.
pub fn parse_metadata(reply: &str) -> Result<DocumentMetadata, MetadataParseError> {
    let body = strip_code_fence(reply);
    let metadata: DocumentMetadata = serde_json::from_str(body)?;

    if metadata.identificacao.titulo.trim().is_empty() {
        return Err(MetadataParseError::EmptyField("identificacao.titulo"));
    }
    if metadata.conclusao_clinica.trim().is_empty() {
        return Err(MetadataParseError::EmptyField("conclusao_clinica"));
    }
    if metadata.resumo_teleprompter.trim().is_empty() {
        return Err(MetadataParseError::EmptyField("resumo_teleprompter"));
    }

    Ok(metadata)
}

/// Remove a leading/trailing Markdown code fence, if present.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Search request accepted by the HTTP surface.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Natural-language query text.
    pub q: String,
    /// Advisory filters folded into the assistant instructions.
    #[serde(default)]
    pub filtros: Option<SearchFilters>,
}

/// Advisory filters for a search. Free strings, never enforced by the core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    /// Publication year hint.
    #[serde(default)]
    pub ano: Option<String>,
    /// Topic hint.
    #[serde(default)]
    pub tema: Option<String>,
    /// Study-type hint.
    #[serde(default)]
    pub tipo_estudo: Option<String>,
}

impl SearchFilters {
    /// True when no filter field carries a value.
    pub fn is_empty(&self) -> bool {
        self.ano.is_none() && self.tema.is_none() && self.tipo_estudo.is_none()
    }
}

/// Answer returned for a search query.
///
/// `documents` is the full catalog of ingested documents with metadata, not a
/// list of passages retrieved for this particular query; the provider's
/// retrieval internals are opaque to this layer, so the catalog serves as a
/// documents-browser fallback alongside the prose answer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchAnswer {
    /// Prose answer produced by the assistant.
    pub content: String,
    /// Every persisted document that has metadata.
    pub documents: Vec<DocumentSummary>,
}

/// One ingested document surfaced alongside a search answer.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Persisted fichamento for the document.
    pub metadata: DocumentMetadata,
    /// Renamed file name, falling back to the original drive name.
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "identificacao": {
                "titulo": "Metformin Trial",
                "ano": 2024,
                "autores": ["Silva, J."],
                "tipo_estudo": "RCT",
                "area_tema": ["Endocrinologia"]
            },
            "metodos": {"populacao": "Adultos com DM2", "n": 412},
            "conclusao_clinica": "Metformina reduziu HbA1c.",
            "resumo_teleprompter": "Estudo randomizado com 412 adultos."
        }"#
    }

    #[test]
    fn parse_metadata_accepts_conforming_reply() {
        let metadata = parse_metadata(sample_json()).expect("valid metadata");
        assert_eq!(metadata.identificacao.titulo, "Metformin Trial");
        assert_eq!(metadata.identificacao.ano, 2024);
        assert_eq!(metadata.identificacao.tipo_estudo, Some(StudyType::Rct));
        assert_eq!(metadata.metodos.as_ref().and_then(|m| m.n), Some(412));
        assert!(metadata.resultados.is_none());
    }

    #[test]
    fn parse_metadata_strips_code_fence() {
        let fenced = format!("```json\n{}\n```", sample_json());
        let metadata = parse_metadata(&fenced).expect("fenced metadata");
        assert_eq!(metadata.identificacao.ano, 2024);
    }

    #[test]
    fn parse_metadata_rejects_missing_required_field() {
        let reply = r#"{
            "identificacao": {"titulo": "X", "ano": 2020},
            "conclusao_clinica": "ok"
        }"#;
        let err = parse_metadata(reply).expect_err("missing resumo_teleprompter");
        assert!(matches!(err, MetadataParseError::Contract(_)));
    }

    #[test]
    fn parse_metadata_rejects_empty_title() {
        let reply = r#"{
            "identificacao": {"titulo": "  ", "ano": 2020},
            "conclusao_clinica": "ok",
            "resumo_teleprompter": "ok"
        }"#;
        let err = parse_metadata(reply).expect_err("blank title");
        assert!(matches!(
            err,
            MetadataParseError::EmptyField("identificacao.titulo")
        ));
    }

    #[test]
    fn parse_metadata_rejects_unknown_study_type() {
        let reply = r#"{
            "identificacao": {"titulo": "X", "ano": 2020, "tipo_estudo": "Anecdote"},
            "conclusao_clinica": "ok",
            "resumo_teleprompter": "ok"
        }"#;
        assert!(parse_metadata(reply).is_err());
    }

    #[test]
    fn metadata_round_trips_without_null_noise() {
        let metadata = parse_metadata(sample_json()).expect("valid metadata");
        let serialized = serde_json::to_value(&metadata).expect("serialize");
        assert!(serialized.get("seguranca").is_none());
        assert_eq!(serialized["identificacao"]["tipo_estudo"], "RCT");
    }

    #[test]
    fn search_filters_report_emptiness() {
        assert!(SearchFilters::default().is_empty());
        let filters = SearchFilters {
            ano: Some("2024".into()),
            ..Default::default()
        };
        assert!(!filters.is_empty());
    }
}
