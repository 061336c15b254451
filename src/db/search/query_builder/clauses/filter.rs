//! Filter/exclude clause construction
//!
//! Resolves one filter key through a closed rule set - trailing comparison
//! operator, JSON-bag path, scalar column - and emits a fully parameterized
//! clause. Unknown fields and type mismatches are reported as errors for the
//! glue to degrade into warnings; they never reach the database.

use serde_json::Value as JsonValue;

use super::super::bind::{push_int, push_text, push_text_array};
use super::super::BindValue;
use crate::config::SearchConfig;
use crate::db::search::schema::{ColumnType, RecordSchema};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    IContains,
    In,
}

impl FilterOp {
    /// Split a trailing operator suffix off a filter key. Longer suffixes
    /// are checked first so `__lte` is not read as `__lt`.
    fn parse_suffix(key: &str) -> (&str, Self) {
        let candidates = [
            ("__icontains", Self::IContains),
            ("__lte", Self::Lte),
            ("__gte", Self::Gte),
            ("__lt", Self::Lt),
            ("__gt", Self::Gt),
            ("__in", Self::In),
        ];
        for (suffix, op) in candidates {
            if let Some(base) = key.strip_suffix(suffix) {
                if !base.is_empty() {
                    return (base, op);
                }
            }
        }
        (key, Self::Eq)
    }

    fn comparison(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            // Rendered specially.
            Self::IContains => "ILIKE",
            Self::In => "= ANY",
        }
    }
}

/// Build one parameterized predicate for a `key: value` filter entry.
pub(in crate::db::search::query_builder) fn build_filter_clause(
    key: &str,
    value: &JsonValue,
    schema: &RecordSchema,
    config: &SearchConfig,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let (base, op) = FilterOp::parse_suffix(key);

    if let Some(rest) = base.strip_prefix(&config.data_prefix) {
        return build_json_clause(key, rest, op, value, schema, config, bind_params);
    }

    build_column_clause(base, op, value, schema, bind_params)
}

/// Predicate over a path inside the JSON bag. The path segments travel as a
/// bound `text[]` parameter, never as SQL text.
fn build_json_clause(
    key: &str,
    rest: &str,
    op: FilterOp,
    value: &JsonValue,
    schema: &RecordSchema,
    config: &SearchConfig,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let segments: Vec<String> = rest
        .split(config.data_delimiter.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if segments.is_empty() {
        return Err(Error::UnknownField(key.to_string()));
    }

    let lhs = |idx: usize| {
        format!(
            "{}.{} #>> ${}",
            schema.table, schema.data_column, idx
        )
    };

    match op {
        FilterOp::In => {
            let values = array_of_text(key, value)?;
            let path_idx = push_text_array(bind_params, segments);
            let values_idx = push_text_array(bind_params, values);
            Ok(format!("{} = ANY(${})", lhs(path_idx), values_idx))
        }
        FilterOp::IContains => {
            let needle = text_value(value).ok_or_else(|| mismatch(key))?;
            let path_idx = push_text_array(bind_params, segments);
            let needle_idx = push_text(bind_params, like_pattern(&needle));
            Ok(format!("{} ILIKE ${}", lhs(path_idx), needle_idx))
        }
        _ => {
            let rendered = text_value(value).ok_or_else(|| mismatch(key))?;
            let path_idx = push_text_array(bind_params, segments);
            let value_idx = push_text(bind_params, rendered);
            Ok(format!("{} {} ${}", lhs(path_idx), op.comparison(), value_idx))
        }
    }
}

/// Predicate over a scalar column, validated against the schema descriptor
/// and type-checked against the filter value.
fn build_column_clause(
    column: &str,
    op: FilterOp,
    value: &JsonValue,
    schema: &RecordSchema,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let column_type = schema
        .column(column)
        .ok_or_else(|| Error::UnknownField(column.to_string()))?;
    let lhs = format!("{}.{}", schema.table, column);

    match op {
        FilterOp::In => {
            let values = array_of_text(column, value)?;
            let idx = push_text_array(bind_params, values);
            return Ok(match column_type {
                ColumnType::BigInt => format!("{} = ANY(${}::bigint[])", lhs, idx),
                ColumnType::Timestamp => format!("{} = ANY(${}::timestamptz[])", lhs, idx),
                ColumnType::Text => format!("{} = ANY(${})", lhs, idx),
            });
        }
        FilterOp::IContains => {
            if column_type != ColumnType::Text {
                return Err(mismatch(column));
            }
            let needle = value.as_str().ok_or_else(|| mismatch(column))?;
            let idx = push_text(bind_params, like_pattern(needle));
            return Ok(format!("{} ILIKE ${}", lhs, idx));
        }
        _ => {}
    }

    let idx = match column_type {
        ColumnType::BigInt => {
            let n = value.as_i64().ok_or_else(|| mismatch(column))?;
            push_int(bind_params, n)
        }
        ColumnType::Text => {
            let s = value.as_str().ok_or_else(|| mismatch(column))?;
            push_text(bind_params, s.to_string())
        }
        ColumnType::Timestamp => {
            let s = value.as_str().ok_or_else(|| mismatch(column))?;
            push_text(bind_params, s.to_string())
        }
    };

    Ok(match column_type {
        ColumnType::Timestamp => format!("{} {} ${}::timestamptz", lhs, op.comparison(), idx),
        _ => format!("{} {} ${}", lhs, op.comparison(), idx),
    })
}

fn mismatch(field: &str) -> Error {
    Error::TypeMismatch(field.to_string())
}

fn text_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn array_of_text(field: &str, value: &JsonValue) -> Result<Vec<String>> {
    let items = value.as_array().ok_or_else(|| mismatch(field))?;
    items
        .iter()
        .map(|item| text_value(item).ok_or_else(|| mismatch(field)))
        .collect()
}

/// Wrap a needle for ILIKE, escaping the pattern metacharacters.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
