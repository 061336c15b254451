//! Record query glue
//!
//! Builds one composed, safely-parameterized query from a request's dynamic
//! parameters: exclude and filter maps first, then the free-text predicate,
//! then the date-range overlap, then the cascading "waterfall" sub-filters,
//! then validated ordering. Every dynamic value and JSON path travels as a
//! bound parameter; a predicate that fails to resolve degrades to a recorded
//! warning instead of failing the request.

use serde_json::{Map, Value as JsonValue};

use super::params::{ListParams, Warnings};
use super::schema::RecordSchema;
use crate::config::SearchConfig;

mod bind;
mod clauses;
pub mod sort;

pub(crate) use bind::push_text;

/// Suffix marking a filter key whose list value expands into sequential
/// single-value filter steps, one per element.
pub const WATERFALL_SUFFIX: &str = "__all";

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone)]
pub enum BindValue {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
}

/// An immutable, composable record query: a select over the schema's table,
/// a conjunction of clauses, rendered ordering fragments and the bind list
/// shared by both. Every narrowing step returns a new value, so an errored
/// stage can throw away its narrowing without touching the rest.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    select: String,
    table: &'static str,
    clauses: Vec<String>,
    order: Vec<String>,
    binds: Vec<BindValue>,
    /// Index into `binds` where ordering parameters begin; the count query
    /// has no ORDER BY and must not bind past this point.
    order_bind_start: Option<usize>,
    limit: Option<i64>,
}

impl RecordQuery {
    pub fn new(schema: &RecordSchema) -> Self {
        Self {
            select: schema.select_columns(),
            table: schema.table,
            clauses: Vec::new(),
            order: Vec::new(),
            binds: Vec::new(),
            order_bind_start: None,
            limit: None,
        }
    }

    fn filter(mut self, clause: String) -> Self {
        self.clauses.push(clause);
        self
    }

    fn exclude(mut self, clause: String) -> Self {
        self.clauses.push(format!("NOT ({})", clause));
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build_sql(&self) -> (String, Vec<BindValue>) {
        let mut sql = format!("SELECT {} FROM {} WHERE 1=1", self.select, self.table);
        for clause in &self.clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        (sql, self.binds.clone())
    }

    pub fn build_count_sql(&self) -> (String, Vec<BindValue>) {
        let mut sql = format!("SELECT COUNT(*) FROM {} WHERE 1=1", self.table);
        for clause in &self.clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        let end = self.order_bind_start.unwrap_or(self.binds.len());
        (sql, self.binds[..end].to_vec())
    }
}

/// Glues a request's filter, exclude, free-text, overlap and ordering
/// parameters into a single record query.
///
/// The parsed `filters` map is kept for callers that key follow-on behavior
/// off it (e.g. "was an explicit status filter given"); `warnings` is `None`
/// when every predicate applied cleanly.
#[derive(Debug)]
pub struct Glue {
    pub query: RecordQuery,
    pub filters: Map<String, JsonValue>,
    pub warnings: Option<Warnings>,
}

impl Glue {
    pub fn new(params: &ListParams, schema: &RecordSchema, config: &SearchConfig) -> Self {
        Self::with_extra_ordering(params, schema, config, &[])
    }

    /// `extra` whitelists "virtual" ordering keys that are not columns on
    /// the schema (e.g. an annotation added by the caller).
    pub fn with_extra_ordering(
        params: &ListParams,
        schema: &RecordSchema,
        config: &SearchConfig,
        extra: &[&str],
    ) -> Self {
        let mut warnings = params.warnings.clone();
        let mut query = RecordQuery::new(schema);

        let (exclude_base, _) = split_waterfall(&params.exclude);
        for (key, value) in exclude_base {
            match checked_clause(&mut query.binds, &key, value, schema, config) {
                Ok(clause) => query = query.exclude(clause),
                Err(message) => {
                    tracing::warn!("skipping exclude {}: {}", key, message);
                    warnings.exclude.push(message);
                }
            }
        }

        let (filter_base, filter_steps) = split_waterfall(&params.filters);
        for (key, value) in filter_base {
            match checked_clause(&mut query.binds, &key, value, schema, config) {
                Ok(clause) => query = query.filter(clause),
                Err(message) => {
                    tracing::warn!("skipping filter {}: {}", key, message);
                    warnings.filters.push(message);
                }
            }
        }

        if let Some(q) = &params.q {
            match schema.fulltext_clause(q, &mut query.binds) {
                Some(clause) => query = query.filter(clause),
                // Record types without the capability ignore free text.
                None => tracing::warn!(
                    "free-text search not available on {}, ignoring query",
                    schema.table
                ),
            }
        }

        if let Some((start, end)) = &params.overlaps {
            let clause = clauses::build_overlap_clause(start, end, schema, &mut query.binds);
            query = query.filter(clause);
        }

        // Waterfall steps: applied progressively, each one independently
        // skippable, so the surviving steps combine as a conjunction.
        for (key, value) in filter_steps {
            match checked_clause(&mut query.binds, &key, &value, schema, config) {
                Ok(clause) => query = query.filter(clause),
                Err(message) => {
                    tracing::warn!("skipping waterfall filter {}: {}", key, message);
                    warnings.filters.push(message);
                }
            }
        }

        let (ordering, order_warnings) =
            sort::validated_ordering(&params.orderby, schema, extra, config);
        warnings.ordering.extend(order_warnings);
        query.order_bind_start = Some(query.binds.len());
        query.order = sort::render_order_fragments(&ordering, schema, &mut query.binds);

        Self {
            query,
            filters: params.filters.clone(),
            warnings: warnings.into_option(),
        }
    }
}

/// Build one clause, rolling back any bind parameters it pushed if it fails,
/// and flattening the error into a warning message.
fn checked_clause(
    binds: &mut Vec<BindValue>,
    key: &str,
    value: &JsonValue,
    schema: &RecordSchema,
    config: &SearchConfig,
) -> std::result::Result<String, String> {
    let mark = binds.len();
    clauses::build_filter_clause(key, value, schema, config, binds).map_err(|e| {
        binds.truncate(mark);
        format!("{}: {}", key, e)
    })
}

/// Partition a filter map into base entries and expanded waterfall steps.
/// A waterfall key whose value is not a list contributes no steps.
fn split_waterfall(
    map: &Map<String, JsonValue>,
) -> (Vec<(String, &JsonValue)>, Vec<(String, JsonValue)>) {
    let mut base = Vec::new();
    let mut steps = Vec::new();

    for (key, value) in map {
        match key.strip_suffix(WATERFALL_SUFFIX) {
            Some(stripped) if !stripped.is_empty() => {
                if let Some(items) = value.as_array() {
                    for item in items {
                        steps.push((stripped.to_string(), item.clone()));
                    }
                } else {
                    tracing::debug!("waterfall key {} has a non-list value, skipping", key);
                }
            }
            _ => base.push((key.clone(), value)),
        }
    }

    (base, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glue_for(pairs: &[(&str, &str)]) -> Glue {
        let config = SearchConfig::default();
        let params = ListParams::from_query_pairs(pairs.iter().copied(), &config);
        Glue::new(&params, &RecordSchema::records(), &config)
    }

    /// Every `$n` placeholder in the SQL must reference an existing bind.
    fn assert_placeholders_covered(sql: &str, binds: &[BindValue]) {
        let highest = sql
            .match_indices('$')
            .filter_map(|(i, _)| {
                sql[i + 1..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse::<usize>()
                    .ok()
            })
            .max()
            .unwrap_or(0);
        assert_eq!(highest, binds.len(), "sql: {}", sql);
    }

    #[test]
    fn composes_filters_excludes_and_ordering() {
        let glue = glue_for(&[
            ("filters", r#"{"status": "public", "data__type": "picture"}"#),
            ("exclude", r#"{"slug": "draft-1"}"#),
            ("orderby", "-date,slug"),
        ]);

        let (sql, binds) = glue.query.build_sql();
        assert!(sql.starts_with("SELECT records.id, records.slug"));
        assert!(sql.contains("NOT (records.slug = $1)"));
        assert!(sql.contains("records.status = $2"));
        assert!(sql.contains("records.data #>> $3 = $4"));
        assert!(sql.ends_with("ORDER BY records.date DESC, records.slug"));
        assert_placeholders_covered(&sql, &binds);
        assert!(glue.warnings.is_none());
        assert_eq!(glue.filters["status"], "public");
    }

    #[test]
    fn unknown_filter_key_degrades_to_a_warning() {
        let glue = glue_for(&[("filters", r#"{"favourite_color": "mauve"}"#)]);

        let (sql, binds) = glue.query.build_sql();
        assert!(sql.ends_with("FROM records WHERE 1=1"));
        assert!(binds.is_empty());
        let warnings = glue.warnings.expect("warning for the dropped key");
        assert_eq!(warnings.filters.len(), 1);
        assert!(warnings.filters[0].contains("favourite_color"));
    }

    #[test]
    fn waterfall_key_expands_into_sequential_steps() {
        let glue = glue_for(&[(
            "filters",
            r#"{"data__tags__all": ["conflict", "telegraph"]}"#,
        )]);

        let (sql, binds) = glue.query.build_sql();
        // One independent clause per list element, combined as a conjunction.
        assert_eq!(sql.matches("records.data #>> ").count(), 2);
        assert_placeholders_covered(&sql, &binds);
        assert!(glue.warnings.is_none());
        // The raw key stays visible to callers.
        assert!(glue.filters.contains_key("data__tags__all"));
    }

    #[test]
    fn free_text_applies_only_with_the_capability() {
        let config = SearchConfig::default();
        let params = ListParams::from_query_pairs([("q", "telegraph cable")], &config);

        let with = Glue::new(&params, &RecordSchema::records(), &config);
        let (sql, _) = with.query.build_sql();
        assert!(sql.contains("search_vector @@ plainto_tsquery($1)"));

        let without = Glue::new(
            &params,
            &RecordSchema::records().without_search(),
            &config,
        );
        let (sql, binds) = without.query.build_sql();
        assert!(!sql.contains("plainto_tsquery"));
        assert!(binds.is_empty());
        assert!(without.warnings.is_none());
    }

    #[test]
    fn overlap_token_builds_the_range_predicate() {
        let glue = glue_for(&[("overlaps", "1900-01-01,1910-12-31")]);
        let (sql, binds) = glue.query.build_sql();
        assert!(sql.contains("records.data ->> 'start_date' <= $1"));
        assert!(sql.contains("records.data ->> 'start_date' <= $2"));
        assert_placeholders_covered(&sql, &binds);
    }

    #[test]
    fn base_predicates_precede_waterfall_steps() {
        let glue = glue_for(&[
            ("filters", r#"{"status": "public", "data__tags__all": ["a"]}"#),
            ("q", "telegraph"),
        ]);
        let (sql, _) = glue.query.build_sql();

        let status = sql.find("records.status").unwrap();
        let fulltext = sql.find("plainto_tsquery").unwrap();
        let waterfall = sql.find("records.data #>> ").unwrap();
        assert!(status < fulltext);
        assert!(fulltext < waterfall);
    }

    #[test]
    fn erroring_stage_discards_only_its_own_narrowing() {
        let glue = glue_for(&[(
            "filters",
            r#"{"id": "not-a-number", "status": "public"}"#,
        )]);
        let (sql, binds) = glue.query.build_sql();
        assert!(sql.contains("records.status = $1"));
        assert_eq!(binds.len(), 1);
        assert!(glue.warnings.is_some());
    }

    #[test]
    fn count_query_shares_the_predicates() {
        let glue = glue_for(&[("filters", r#"{"status": "public"}"#)]);
        let (sql, binds) = glue.query.build_count_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM records WHERE 1=1 AND records.status = $1"
        );
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn count_query_drops_ordering_binds() {
        let glue = glue_for(&[
            ("filters", r#"{"status": "public"}"#),
            ("orderby", "-data__num_priority"),
        ]);

        let (sql, binds) = glue.query.build_sql();
        assert!(sql.contains("ORDER BY CAST(records.data ->> $2 AS integer) DESC"));
        assert_eq!(binds.len(), 2);

        let (count_sql, count_binds) = glue.query.build_count_sql();
        assert!(!count_sql.contains("ORDER BY"));
        assert_eq!(count_binds.len(), 1);
        assert_placeholders_covered(&count_sql, &count_binds);
    }
}
