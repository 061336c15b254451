//! Search vector refresh hook
//!
//! Emits one `update_search_vector` job per record mutation. Enqueue
//! failures are logged, never propagated: a missing vector refresh degrades
//! search ranking, not the mutation that triggered it.

use async_trait::async_trait;
use std::sync::Arc;

use super::RecordHook;
use crate::models::Record;
use crate::queue::{JobPriority, JobQueue, JobType};
use crate::Result;

pub struct SearchVectorHook {
    job_queue: Arc<dyn JobQueue>,
}

impl SearchVectorHook {
    pub fn new(job_queue: Arc<dyn JobQueue>) -> Self {
        Self { job_queue }
    }

    async fn enqueue_refresh(&self, record: &Record) {
        let job = JobType::update_search_vector(record.id);
        if let Err(e) = self.job_queue.enqueue(job, JobPriority::Normal).await {
            tracing::error!(
                "failed to enqueue search vector refresh for record {}: {}",
                record.id,
                e
            );
        }
    }
}

#[async_trait]
impl RecordHook for SearchVectorHook {
    async fn on_created(&self, record: &Record) -> Result<()> {
        self.enqueue_refresh(record).await;
        Ok(())
    }

    async fn on_updated(&self, record: &Record) -> Result<()> {
        self.enqueue_refresh(record).await;
        Ok(())
    }

    async fn on_deleted(&self, _pk: i64) -> Result<()> {
        // The vector rides the row; deleting the record removes it.
        Ok(())
    }
}
