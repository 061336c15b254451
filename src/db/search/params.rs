//! Request query-parameter parsing
//!
//! Consumes the raw listing surface - `filters` and `exclude` (JSON-encoded
//! maps), `q` (free text), `overlaps` (comma-separated start,end token) and
//! `orderby` (comma-separated, optionally `-`-prefixed field list). Malformed
//! payloads degrade to their empty equivalents with a recorded warning; they
//! never fail the request.

use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::config::SearchConfig;

/// Per-request diagnostics surfaced to the caller. `None` on the glue when
/// every predicate applied cleanly.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct Warnings {
    pub filters: Vec<String>,
    pub exclude: Vec<String>,
    pub ordering: Vec<String>,
    pub overlaps: Vec<String>,
}

impl Warnings {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.exclude.is_empty()
            && self.ordering.is_empty()
            && self.overlaps.is_empty()
    }

    pub(crate) fn into_option(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Parsed listing parameters, constructed once per request and discarded
/// with it.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filters: Map<String, JsonValue>,
    pub exclude: Map<String, JsonValue>,
    /// Free-text query, present only when long enough to activate.
    pub q: Option<String>,
    /// Date-range overlap probe as (start, end).
    pub overlaps: Option<(String, String)>,
    pub orderby: Vec<String>,

    raw: Vec<(String, String)>,
    pub(crate) warnings: Warnings,
}

impl ListParams {
    pub fn from_query_pairs<'a, I>(pairs: I, config: &SearchConfig) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();

        for (key, value) in pairs {
            params.raw.push((key.to_string(), value.to_string()));
            match key {
                "filters" => {
                    params.filters = parse_json_map(value, "filters", &mut params.warnings.filters)
                }
                "exclude" => {
                    params.exclude = parse_json_map(value, "exclude", &mut params.warnings.exclude)
                }
                "q" => {
                    let q = value.trim();
                    if q.chars().count() >= config.min_query_length {
                        params.q = Some(q.to_string());
                    }
                }
                "overlaps" => match value.split_once(',') {
                    Some((start, end)) => {
                        params.overlaps =
                            Some((start.trim().to_string(), end.trim().to_string()));
                    }
                    None => params
                        .warnings
                        .overlaps
                        .push(format!("expected \"start,end\", got \"{}\"", value)),
                },
                "orderby" => {
                    params.orderby = value
                        .split(',')
                        .map(str::trim)
                        .filter(|field| !field.is_empty())
                        .map(|field| field.to_string())
                        .collect();
                }
                // Pagination and serialization keys belong to other layers.
                _ => {}
            }
        }

        params
    }

    /// Stable digest of the request parameters, usable as a cache key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Human-readable canonical form of the request parameters.
    pub fn canonical(&self) -> String {
        let mut pairs = self.raw.clone();
        pairs.sort();
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn parse_json_map(raw: &str, field: &str, warnings: &mut Vec<String>) -> Map<String, JsonValue> {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => map,
        Ok(other) => {
            warnings.push(format!("{} must be a JSON object, got {}", field, other));
            Map::new()
        }
        Err(e) => {
            tracing::warn!("unparseable {} payload: {}", field, e);
            warnings.push(format!("unparseable {} payload: {}", field, e));
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn parses_the_full_listing_surface() {
        let params = ListParams::from_query_pairs(
            [
                ("filters", r#"{"status": "public"}"#),
                ("exclude", r#"{"slug": "hidden"}"#),
                ("q", "telegraph"),
                ("overlaps", "1900-01-01, 1910-12-31"),
                ("orderby", "-date, slug"),
            ],
            &config(),
        );

        assert_eq!(params.filters["status"], "public");
        assert_eq!(params.exclude["slug"], "hidden");
        assert_eq!(params.q.as_deref(), Some("telegraph"));
        assert_eq!(
            params.overlaps,
            Some(("1900-01-01".to_string(), "1910-12-31".to_string()))
        );
        assert_eq!(params.orderby, vec!["-date", "slug"]);
        assert!(params.warnings.is_empty());
    }

    #[test]
    fn unparseable_filters_degrade_to_empty_with_warning() {
        let params = ListParams::from_query_pairs([("filters", "{not json")], &config());
        assert!(params.filters.is_empty());
        assert_eq!(params.warnings.filters.len(), 1);
    }

    #[test]
    fn short_free_text_query_is_ignored() {
        let params = ListParams::from_query_pairs([("q", "a")], &config());
        assert!(params.q.is_none());
    }

    #[test]
    fn overlap_without_comma_records_a_warning() {
        let params = ListParams::from_query_pairs([("overlaps", "1900-01-01")], &config());
        assert!(params.overlaps.is_none());
        assert_eq!(params.warnings.overlaps.len(), 1);
    }

    #[test]
    fn digest_is_stable_across_pair_order() {
        let a = ListParams::from_query_pairs(
            [("q", "telegraph"), ("orderby", "slug")],
            &config(),
        );
        let b = ListParams::from_query_pairs(
            [("orderby", "slug"), ("q", "telegraph")],
            &config(),
        );
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
