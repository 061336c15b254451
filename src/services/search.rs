//! Ranked full-text search over persisted vectors

use sqlx::{FromRow, PgPool, Row};

use crate::db::search::RecordSchema;
use crate::models::Record;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: Record,
    pub rank: f32,
}

/// Run a ranked query against the persisted search vectors, most relevant
/// first.
pub async fn search_records(
    pool: &PgPool,
    schema: &RecordSchema,
    query: &str,
) -> Result<Vec<SearchHit>> {
    let Some(column) = schema.search_vector_column() else {
        return Err(Error::Search(format!(
            "{} does not support full-text search",
            schema.table
        )));
    };

    let sql = format!(
        "SELECT {select}, ts_rank({t}.{col}, plainto_tsquery($1)) AS rank \
         FROM {t} WHERE {t}.{col} @@ plainto_tsquery($1) ORDER BY rank DESC",
        select = schema.select_columns(),
        t = schema.table,
        col = column,
    );

    let rows = sqlx::query(&sql)
        .bind(query)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    let mut hits = Vec::with_capacity(rows.len());
    for row in &rows {
        let record = Record::from_row(row).map_err(Error::Database)?;
        let rank: f32 = row.try_get("rank").map_err(Error::Database)?;
        hits.push(SearchHit { record, rank });
    }
    Ok(hits)
}
