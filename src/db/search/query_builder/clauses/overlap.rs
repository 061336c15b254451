//! Date-range overlap predicate
//!
//! Plain comparisons like `start_date__gt` + `end_date__lt` cannot express
//! range overlaps, so the probe is tested against the stored range directly:
//!
//! case 1, left (outer) overlap:
//! ```text
//!      S |------------>| T
//!  OS|----------->OT
//! ```
//! case 2, right (inner) overlap:
//! ```text
//!      S |------------>| T
//!          OS|--->OT
//! ```
//!
//! Both arms compare the probe's start bound against the stored bounds; the
//! probe's end bound only limits the inner case.

use super::super::bind::push_text;
use super::super::BindValue;
use crate::db::search::schema::RecordSchema;

pub(in crate::db::search::query_builder) fn build_overlap_clause(
    start: &str,
    end: &str,
    schema: &RecordSchema,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let data = format!("{}.{}", schema.table, schema.data_column);
    let s_idx = push_text(bind_params, start.to_string());
    let e_idx = push_text(bind_params, end.to_string());

    format!(
        "(({data} ->> 'start_date' <= ${s} AND {data} ->> 'end_date' >= ${s}) \
         OR ({data} ->> 'start_date' >= ${s} AND {data} ->> 'start_date' <= ${e}))",
        data = data,
        s = s_idx,
        e = e_idx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_two_armed_overlap_test() {
        let mut binds = Vec::new();
        let clause = build_overlap_clause(
            "1900-01-01",
            "1910-12-31",
            &RecordSchema::records(),
            &mut binds,
        );

        assert_eq!(
            clause,
            "((records.data ->> 'start_date' <= $1 AND records.data ->> 'end_date' >= $1) \
             OR (records.data ->> 'start_date' >= $1 AND records.data ->> 'start_date' <= $2))"
        );
        assert_eq!(binds.len(), 2);
        assert!(matches!(&binds[0], BindValue::Text(s) if s == "1900-01-01"));
        assert!(matches!(&binds[1], BindValue::Text(s) if s == "1910-12-31"));
    }
}
