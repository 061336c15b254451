//! Search vector maintenance
//!
//! The updater fully recomputes one record's vector from its current
//! persisted state and writes it with a single primary-key-scoped statement.
//! Concurrent updates to the same record are last-write-wins: the stored
//! vector always reflects some consistent snapshot of the record.

mod compile;

pub use compile::{compile_search_vector, CompiledVector};

use sqlx::PgPool;

use crate::config::SearchConfig;
use crate::db::PgRecordStore;
use crate::Result;

pub struct IndexingService {
    store: PgRecordStore,
    config: SearchConfig,
}

impl IndexingService {
    pub fn new(pool: PgPool, config: SearchConfig) -> Self {
        Self {
            store: PgRecordStore::new(pool),
            config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    /// Recompute and persist the search vector for one record.
    ///
    /// A record with nothing to index keeps its current vector; an absent
    /// record is an error for the caller's retry logic to handle.
    pub async fn update_search_vector(&self, pk: i64) -> Result<()> {
        let record = self.store.load_record(pk).await?;

        let Some(compiled) = compile_search_vector(&record, &self.config) else {
            tracing::info!("record {} has nothing to index, skipping vector update", pk);
            return Ok(());
        };

        self.store.update_search_vector(pk, &compiled).await?;
        tracing::info!(
            record = pk,
            terms = compiled.contents.len(),
            "search vector updated"
        );
        Ok(())
    }
}
