//! Base worker trait

use async_trait::async_trait;

use crate::{queue::Job, Result};

/// Base trait for all background workers
#[async_trait]
pub trait Worker: Send + Sync {
    /// Worker name for logging
    fn name(&self) -> &str;

    /// Job types this worker consumes
    fn supported_job_types(&self) -> &[&str];

    /// Start the worker
    async fn start(&self) -> Result<()>;

    /// Stop the worker gracefully
    async fn stop(&self) -> Result<()>;

    /// Process a single job
    async fn process_job(&self, job: Job) -> Result<()>;
}
