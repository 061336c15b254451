//! Post-mutation hooks
//!
//! The write path invokes these deliberately after a record mutation
//! commits; nothing hooks into persistence-layer lifecycle events
//! implicitly.

mod search_vector;

pub use search_vector::SearchVectorHook;

use async_trait::async_trait;

use crate::models::Record;
use crate::Result;

#[async_trait]
pub trait RecordHook: Send + Sync {
    async fn on_created(&self, record: &Record) -> Result<()>;

    async fn on_updated(&self, record: &Record) -> Result<()>;

    async fn on_deleted(&self, pk: i64) -> Result<()>;
}
