//! Search vector compilation
//!
//! Builds the weighted, multi-language ranked-text expression for one record
//! from its scalar fields and the per-language values inside its JSON bag.
//! The expression template is parameterized; the content values are supplied
//! positionally at execution time and never interpolated.

use crate::config::{SearchConfig, Weight};
use crate::models::Record;

/// A compiled search vector: the `tsvector` expression with `$n`
/// placeholders, and the ordered (value, weight, stemmer) tuples that bind
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledVector {
    pub expression: String,
    pub contents: Vec<(String, Weight, String)>,
}

/// Compile the search vector for `record`.
///
/// Returns `None` when no content entry is produced (a wholly empty record);
/// the caller must skip the persist step rather than write an empty vector.
/// For a fixed record and configuration the output is identical on every
/// call.
pub fn compile_search_vector(record: &Record, config: &SearchConfig) -> Option<CompiledVector> {
    let mut contents: Vec<(String, Weight, String)> = Vec::new();

    for simple in &config.simple_fields {
        match scalar_field_value(record, &simple.field) {
            Some(value) => contents.push((value, simple.weight, simple.stemmer.clone())),
            None => tracing::warn!("unknown scalar field {}, skipping", simple.field),
        }
    }

    for multi in &config.multilanguage_fields {
        for language in &config.languages {
            let Some(value) = record
                .data
                .get(&multi.field)
                .and_then(|field| field.get(&language.suffix))
            else {
                tracing::debug!(
                    "no {}.{} on record {}",
                    multi.field,
                    language.suffix,
                    record.id
                );
                continue;
            };
            if let Some(text) = value.as_str() {
                if !text.is_empty() {
                    contents.push((text.to_string(), multi.weight, language.stemmer.clone()));
                }
            }
        }
    }

    // Stemmer names come from configuration, not requests, but they are the
    // only non-bound part of the template: reject anything unexpected.
    contents.retain(|(_, _, stemmer)| {
        let valid = !stemmer.is_empty() && stemmer.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            tracing::warn!("invalid stemmer name {:?}, dropping entry", stemmer);
        }
        valid
    });

    if contents.is_empty() {
        return None;
    }

    // Terms concatenate with the tsvector `||` operator; the generic
    // "simple" tokenizer omits the language argument.
    let expression = contents
        .iter()
        .enumerate()
        .map(|(i, (_, weight, stemmer))| {
            let position = i + 1;
            if stemmer == "simple" {
                format!(
                    "setweight(to_tsvector(COALESCE(${},'')), '{}')",
                    position, weight
                )
            } else {
                format!(
                    "setweight(to_tsvector('{}',COALESCE(${},'')), '{}')",
                    stemmer, position, weight
                )
            }
        })
        .collect::<Vec<_>>()
        .join(" || ");

    Some(CompiledVector {
        expression,
        contents,
    })
}

/// Read a scalar record field by configured name. A closed set, not
/// reflection: unknown names are skipped by the caller.
fn scalar_field_value(record: &Record, field: &str) -> Option<String> {
    match field {
        "id" => Some(record.id.to_string()),
        "slug" => Some(record.slug.clone()),
        "title" => Some(record.title.clone()),
        "status" => Some(record.status.as_str().to_string()),
        _ => None,
    }
}
