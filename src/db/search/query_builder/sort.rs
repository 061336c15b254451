//! Ordering validation
//!
//! Whitelists requested sort keys against the record schema. JSON-bag keys
//! get parameter-bound expressions - a numeric cast when the terminal segment
//! carries the `num_` marker, a lowercased text sort otherwise - so no
//! dynamic path component is ever spliced into the expression template.
//! Unknown keys are dropped with a warning, never an error.

use super::bind::push_text;
use super::BindValue;
use crate::config::SearchConfig;
use crate::db::search::schema::RecordSchema;

/// Marker prefix on a JSON terminal segment requesting an integer sort.
const NUMERIC_SORT_MARKER: &str = "num_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    /// A scalar column validated against the schema (or whitelisted).
    Column(String),
    /// Case-insensitive sort on a top-level JSON bag key.
    JsonText { key: String },
    /// Integer-cast sort on a top-level JSON bag key.
    JsonNumeric { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderExpr {
    pub key: OrderKey,
    pub descending: bool,
}

/// Validate requested sort keys, in request order. Returns the accepted
/// expressions and a warning per dropped key.
pub fn validated_ordering(
    requested: &[String],
    schema: &RecordSchema,
    extra: &[&str],
    config: &SearchConfig,
) -> (Vec<OrderExpr>, Vec<String>) {
    let mut ordering = Vec::new();
    let mut warnings = Vec::new();

    for field in requested {
        let descending = field.starts_with('-');
        let name = field.trim_start_matches('-');

        if name.starts_with(&config.data_prefix) {
            let parts: Vec<&str> = name.split(config.data_delimiter.as_str()).collect();
            // Sort keys address top-level bag keys only: the bound key is
            // the first segment after the bag prefix.
            let Some(key) = parts.get(1).filter(|key| !key.is_empty()) else {
                warnings.push(format!("ordering not found on specified field: {}", name));
                continue;
            };
            let key = key.to_string();
            let numeric = parts
                .last()
                .is_some_and(|last| last.starts_with(NUMERIC_SORT_MARKER));
            ordering.push(OrderExpr {
                key: if numeric {
                    OrderKey::JsonNumeric { key }
                } else {
                    OrderKey::JsonText { key }
                },
                descending,
            });
        } else if extra.contains(&name) || schema.column(name).is_some() {
            ordering.push(OrderExpr {
                key: OrderKey::Column(name.to_string()),
                descending,
            });
        } else {
            tracing::warn!("ordering not found on specified field: {}", name);
            warnings.push(format!("ordering not found on specified field: {}", name));
        }
    }

    (ordering, warnings)
}

/// Render validated ordering expressions, pushing the JSON keys as bound
/// parameters.
pub(in crate::db::search) fn render_order_fragments(
    ordering: &[OrderExpr],
    schema: &RecordSchema,
    bind_params: &mut Vec<BindValue>,
) -> Vec<String> {
    ordering
        .iter()
        .map(|expr| {
            let rendered = match &expr.key {
                OrderKey::Column(name) => format!("{}.{}", schema.table, name),
                OrderKey::JsonText { key } => {
                    let idx = push_text(bind_params, key.clone());
                    format!(
                        "LOWER({}.{} ->> ${})",
                        schema.table, schema.data_column, idx
                    )
                }
                OrderKey::JsonNumeric { key } => {
                    let idx = push_text(bind_params, key.clone());
                    format!(
                        "CAST({}.{} ->> ${} AS integer)",
                        schema.table, schema.data_column, idx
                    )
                }
            };
            if expr.descending {
                format!("{} DESC", rendered)
            } else {
                rendered
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(requested: &[&str], extra: &[&str]) -> (Vec<OrderExpr>, Vec<String>) {
        let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
        validated_ordering(
            &requested,
            &RecordSchema::records(),
            extra,
            &SearchConfig::default(),
        )
    }

    #[test]
    fn numeric_marker_requests_an_integer_cast_sort() {
        let (ordering, warnings) = validate(&["-data__num_priority"], &[]);
        assert!(warnings.is_empty());
        assert_eq!(
            ordering,
            vec![OrderExpr {
                key: OrderKey::JsonNumeric {
                    key: "num_priority".to_string()
                },
                descending: true,
            }]
        );

        let mut binds = Vec::new();
        let fragments =
            render_order_fragments(&ordering, &RecordSchema::records(), &mut binds);
        assert_eq!(
            fragments,
            vec!["CAST(records.data ->> $1 AS integer) DESC"]
        );
        assert!(matches!(&binds[0], BindValue::Text(s) if s == "num_priority"));
    }

    #[test]
    fn json_keys_default_to_case_insensitive_text_sort() {
        let (ordering, _) = validate(&["data__country"], &[]);
        let mut binds = Vec::new();
        let fragments =
            render_order_fragments(&ordering, &RecordSchema::records(), &mut binds);
        assert_eq!(fragments, vec!["LOWER(records.data ->> $1)"]);
    }

    #[test]
    fn unknown_field_is_dropped_with_a_warning() {
        let (ordering, warnings) = validate(&["unknown_field", "slug"], &[]);
        assert_eq!(ordering.len(), 1);
        assert_eq!(ordering[0].key, OrderKey::Column("slug".to_string()));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unknown_field"));
    }

    #[test]
    fn whitelisted_virtual_keys_bypass_the_schema_check() {
        let (ordering, warnings) = validate(&["-rank"], &["rank"]);
        assert!(warnings.is_empty());
        assert_eq!(ordering[0].key, OrderKey::Column("rank".to_string()));
        assert!(ordering[0].descending);
    }
}
