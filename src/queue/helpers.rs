//! Helper functions for job queue operations

use sqlx::PgPool;

use super::models::Job;
use crate::Result;

/// Try to dequeue a job without blocking. Claims the oldest pending job of
/// the requested types, highest priority first, skipping rows other workers
/// hold.
pub async fn try_dequeue_job(
    pool: &PgPool,
    job_types: &[String],
    worker_id: &str,
) -> Result<Option<Job>> {
    let now = chrono::Utc::now();

    let result = sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs
        SET status = 'running',
            started_at = $1,
            worker_id = $2
        WHERE id = (
            SELECT id
            FROM jobs
            WHERE job_type = ANY($3)
              AND status = 'pending'
              AND (scheduled_at IS NULL OR scheduled_at <= $1)
            ORDER BY priority DESC, created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, job_type, status, priority, parameters,
                  error_message, last_error_at, scheduled_at,
                  created_at, started_at, completed_at, worker_id
        "#,
    )
    .bind(now)
    .bind(worker_id)
    .bind(job_types)
    .fetch_optional(pool)
    .await
    .map_err(crate::Error::Database)?;

    Ok(result)
}
