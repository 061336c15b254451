//! Job queue trait

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use super::models::{Job, JobPriority, JobType};
use crate::Result;

pub type JobStream = BoxStream<'static, Result<Job>>;

/// An at-least-once task dispatcher. Submitters never block on completion;
/// workers consume jobs through `listen`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit one job. Returns immediately with the job id.
    async fn enqueue(&self, job_type: JobType, priority: JobPriority) -> Result<Uuid>;

    /// Stream jobs of the given types as they become available. The stream
    /// ends when the underlying connection is lost; callers re-listen.
    async fn listen(&self, job_types: &[String]) -> Result<JobStream>;

    async fn complete_job(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job failed, recording the error. The record it targeted keeps
    /// whatever state it had.
    async fn fail_job(&self, job_id: Uuid, error: &str) -> Result<()>;
}
