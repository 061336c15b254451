//! PostgreSQL job queue
//!
//! Jobs live in the `jobs` table; LISTEN/NOTIFY wakes workers promptly and a
//! periodic poll covers missed notifications, so delivery stays at-least-once
//! even across dropped connections.

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::time::Duration;
use uuid::Uuid;

use super::helpers::try_dequeue_job;
use super::models::{JobPriority, JobType};
use super::traits::{JobQueue, JobStream};
use crate::{Error, Result};

const CHANNEL: &str = "folio_jobs";
const POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct PostgresJobQueue {
    pool: PgPool,
    worker_id: String,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            worker_id: format!("folio-{}", Uuid::new_v4()),
        }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(&self, job_type: JobType, priority: JobPriority) -> Result<Uuid> {
        let parameters = serde_json::to_value(&job_type)
            .map_err(|e| Error::JobQueue(format!("unserializable job parameters: {}", e)))?;
        let job_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO jobs (id, job_type, status, priority, parameters, created_at)
             VALUES ($1, $2, 'pending', $3, $4, NOW())",
        )
        .bind(job_id)
        .bind(job_type.job_type_name())
        .bind(priority as i32)
        .bind(&parameters)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANNEL)
            .bind(job_type.job_type_name())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        tracing::debug!(
            job_id = %job_id,
            job_type = job_type.job_type_name(),
            "job enqueued"
        );
        Ok(job_id)
    }

    async fn listen(&self, job_types: &[String]) -> Result<JobStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(Error::Database)?;
        listener.listen(CHANNEL).await.map_err(Error::Database)?;

        let pool = self.pool.clone();
        let worker_id = self.worker_id.clone();
        let types: Vec<String> = job_types.to_vec();

        let stream = async_stream::stream! {
            loop {
                match try_dequeue_job(&pool, &types, &worker_id).await {
                    Ok(Some(job)) => {
                        yield Ok(job);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }

                // Nothing pending: wait for a notification, with a periodic
                // poll in case one was missed. A lost listener connection
                // ends the stream; the worker runner re-listens.
                tokio::select! {
                    notification = listener.recv() => {
                        if notification.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn complete_job(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE jobs
             SET status = 'failed', error_message = $2, last_error_at = NOW(),
                 completed_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
