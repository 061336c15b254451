//! In-memory job queue for tests and immediate-mode tooling

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use super::models::{Job, JobPriority, JobStatus, JobType};
use super::traits::{JobQueue, JobStream};
use crate::{Error, Result};

#[derive(Default)]
struct InlineState {
    pending: VecDeque<Job>,
    completed: Vec<Uuid>,
    failed: Vec<(Uuid, String)>,
}

/// A queue that keeps jobs in memory. Same contract as the Postgres queue,
/// minus persistence.
#[derive(Clone, Default)]
pub struct InlineJobQueue {
    state: Arc<Mutex<InlineState>>,
    notify: Arc<Notify>,
}

impl InlineJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_jobs(&self) -> Vec<Uuid> {
        self.state.lock().expect("queue state").completed.clone()
    }

    pub fn failed_jobs(&self) -> Vec<(Uuid, String)> {
        self.state.lock().expect("queue state").failed.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().expect("queue state").pending.len()
    }
}

#[async_trait]
impl JobQueue for InlineJobQueue {
    async fn enqueue(&self, job_type: JobType, priority: JobPriority) -> Result<Uuid> {
        let parameters = serde_json::to_value(&job_type)
            .map_err(|e| Error::JobQueue(format!("unserializable job parameters: {}", e)))?;
        let job = Job {
            id: Uuid::new_v4(),
            job_type: job_type.job_type_name().to_string(),
            status: JobStatus::Pending,
            priority: priority as i32,
            parameters,
            error_message: None,
            last_error_at: None,
            scheduled_at: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            worker_id: None,
        };
        let id = job.id;
        self.state.lock().expect("queue state").pending.push_back(job);
        self.notify.notify_one();
        Ok(id)
    }

    async fn listen(&self, job_types: &[String]) -> Result<JobStream> {
        let state = self.state.clone();
        let notify = self.notify.clone();
        let types: Vec<String> = job_types.to_vec();

        let stream = async_stream::stream! {
            loop {
                let next = {
                    let mut guard = state.lock().expect("queue state");
                    let position = guard
                        .pending
                        .iter()
                        .position(|job| types.contains(&job.job_type));
                    position.and_then(|i| guard.pending.remove(i))
                };
                match next {
                    Some(mut job) => {
                        job.status = JobStatus::Running;
                        job.started_at = Some(Utc::now());
                        yield Ok(job);
                    }
                    None => notify.notified().await,
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn complete_job(&self, job_id: Uuid) -> Result<()> {
        self.state.lock().expect("queue state").completed.push(job_id);
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, error: &str) -> Result<()> {
        self.state
            .lock()
            .expect("queue state")
            .failed
            .push((job_id, error.to_string()));
        Ok(())
    }
}
