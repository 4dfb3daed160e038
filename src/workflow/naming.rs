//! Deterministic file-name derivation from extracted metadata.

use crate::schema::DocumentMetadata;

const TITLE_PREFIX_CHARS: usize = 30;
const TOPIC_PREFIX_CHARS: usize = 20;

const AUTHOR_FALLBACK: &str = "Autor";
const TITLE_FALLBACK: &str = "Titulo";
const TOPIC_FALLBACK: &str = "Tema";

/// Derive the drive file name for a validated fichamento.
pub fn file_name_for(metadata: &DocumentMetadata) -> String {
    let ident = &metadata.identificacao;
    derive_file_name(
        Some(ident.ano),
        ident.autores.as_deref(),
        Some(ident.titulo.as_str()),
        ident.area_tema.as_deref(),
    )
}

/// Derive a file name from whatever metadata fields are available.
///
/// Pure and total: any combination of absent fields yields a valid name,
/// substituting `Autor`/`Titulo`/`Tema` for missing segments and an empty
/// string for a missing year. The author segment is the first author's
/// surname (text before the first comma); title and topic segments are
/// truncated to 30 and 20 characters before sanitization.
pub fn derive_file_name(
    ano: Option<i32>,
    autores: Option<&[String]>,
    titulo: Option<&str>,
    temas: Option<&[String]>,
) -> String {
    let year = ano.map(|value| value.to_string()).unwrap_or_default();

    let author = autores
        .and_then(|authors| authors.first())
        .map(|author| author.split(',').next().unwrap_or(author))
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| AUTHOR_FALLBACK.to_string());

    let title = titulo
        .map(|value| sanitize_segment(truncate_chars(value, TITLE_PREFIX_CHARS)))
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| TITLE_FALLBACK.to_string());

    let topic = temas
        .and_then(|topics| topics.first())
        .map(|value| sanitize_segment(truncate_chars(value, TOPIC_PREFIX_CHARS)))
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| TOPIC_FALLBACK.to_string());

    format!("{year}_{author}_{title}_{topic}.pdf")
}

/// Map whitespace runs to `_` and drop every other non-alphanumeric character.
fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut pending_separator = false;

    for ch in segment.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else if ch.is_whitespace() {
            pending_separator = true;
        }
    }

    out
}

/// Truncate to at most `max` characters on a character boundary.
fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
