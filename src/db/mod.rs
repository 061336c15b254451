//! Postgres record store

pub mod search;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::Record;
use crate::services::indexing::CompiledVector;
use crate::{Error, Result};
use search::{BindValue, RecordQuery};

/// Connect a pool using the database configuration.
pub async fn connect(config: &crate::config::DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.url)
        .await
        .map_err(Error::Database)?;
    Ok(pool)
}

/// Apply schema migrations bundled with the crate.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Internal(format!("migration failed: {}", e)))?;
    Ok(())
}

/// Store for records and their derived search vectors. All statements are
/// parameterized; SQL text only ever contains schema-validated fragments.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn load_record(&self, pk: i64) -> Result<Record> {
        let record = sqlx::query_as::<_, Record>(
            "SELECT id, slug, title, status, data, date, date_created, date_last_modified
             FROM records WHERE id = $1",
        )
        .bind(pk)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        record.ok_or(Error::RecordNotFound(pk))
    }

    /// Execute a composed listing query.
    pub async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let (sql, binds) = query.build_sql();
        let mut fetch = sqlx::query_as::<_, Record>(&sql);
        for value in binds {
            fetch = match value {
                BindValue::Text(v) => fetch.bind(v),
                BindValue::TextArray(vs) => fetch.bind(vs),
                BindValue::Int(v) => fetch.bind(v),
            };
        }
        let records = fetch
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(records)
    }

    pub async fn count(&self, query: &RecordQuery) -> Result<i64> {
        let (sql, binds) = query.build_count_sql();
        let mut scalar = sqlx::query_scalar::<_, i64>(&sql);
        for value in binds {
            scalar = match value {
                BindValue::Text(v) => scalar.bind(v),
                BindValue::TextArray(vs) => scalar.bind(vs),
                BindValue::Int(v) => scalar.bind(v),
            };
        }
        scalar.fetch_one(&self.pool).await.map_err(Error::Database)
    }

    /// Recompute and store one record's search vector, scoped by primary
    /// key. Never a bulk rewrite.
    pub async fn update_search_vector(&self, pk: i64, compiled: &CompiledVector) -> Result<()> {
        let pk_position = compiled.contents.len() + 1;
        let sql = format!(
            "UPDATE records SET search_vector = {} WHERE id = ${}",
            compiled.expression, pk_position
        );

        let mut update = sqlx::query(&sql);
        for (value, _, _) in &compiled.contents {
            update = update.bind(value.clone());
        }
        update = update.bind(pk);

        update.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }
}
