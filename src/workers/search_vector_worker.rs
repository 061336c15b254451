//! Search vector worker
//!
//! Consumes `update_search_vector` jobs: load the record, compile its
//! vector, persist it with a single-row update. Transient failures retry
//! with backoff; an exhausted budget leaves the record with a stale or
//! absent vector and marks the job failed - CRUD access is never blocked by
//! index maintenance.

use async_trait::async_trait;
use std::sync::Arc;

use super::base::Worker;
use super::retry::retry_with_backoff;
use crate::config::RetryConfig;
use crate::queue::{Job, JobQueue, JobType};
use crate::services::IndexingService;
use crate::Result;

pub struct SearchVectorWorker {
    job_queue: Arc<dyn JobQueue>,
    indexing_service: Arc<IndexingService>,
    retry: RetryConfig,
}

impl SearchVectorWorker {
    pub fn new(
        job_queue: Arc<dyn JobQueue>,
        indexing_service: Arc<IndexingService>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            job_queue,
            indexing_service,
            retry,
        }
    }

    async fn update_with_retry(&self, record_pk: i64) -> Result<()> {
        let indexing = self.indexing_service.clone();
        retry_with_backoff("update_search_vector", &self.retry, move || {
            let indexing = indexing.clone();
            async move { indexing.update_search_vector(record_pk).await }
        })
        .await
    }
}

#[async_trait]
impl Worker for SearchVectorWorker {
    fn name(&self) -> &str {
        "SearchVectorWorker"
    }

    fn supported_job_types(&self) -> &[&str] {
        &["update_search_vector", "echo"]
    }

    async fn start(&self) -> Result<()> {
        tracing::info!("{} starting", self.name());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        tracing::info!("{} stopping", self.name());
        Ok(())
    }

    async fn process_job(&self, job: Job) -> Result<()> {
        let params = match job.job_type_params() {
            Ok(params) => params,
            Err(e) => {
                let message = format!("undecodable job parameters: {}", e);
                tracing::error!("{}: {}", self.name(), message);
                self.job_queue.fail_job(job.id, &message).await?;
                return Ok(());
            }
        };

        match params {
            JobType::Echo { message } => {
                tracing::info!("Message: {}", message);
                self.job_queue.complete_job(job.id).await?;
            }
            JobType::UpdateSearchVector {
                record_type,
                record_pk,
            } => {
                tracing::info!(
                    "{} refreshing vector for {} pk:{}",
                    self.name(),
                    record_type,
                    record_pk
                );
                match self.update_with_retry(record_pk).await {
                    Ok(()) => self.job_queue.complete_job(job.id).await?,
                    Err(e) => {
                        // The vector stays stale; only search ranking quality
                        // is affected until a later mutation refreshes it.
                        tracing::error!(
                            "{} giving up on {} pk:{}: {}",
                            self.name(),
                            record_type,
                            record_pk,
                            e
                        );
                        self.job_queue.fail_job(job.id, &e.to_string()).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
