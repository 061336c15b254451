//! Job queue domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TryFrom<String> for JobStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", value)),
        }
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum JobPriority {
    Low = 0,
    Normal = 5,
    High = 10,
    Critical = 20,
}

/// Job types for background processing, serialized into the job row's
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum JobType {
    /// Recompute the search vector for one record.
    UpdateSearchVector { record_type: String, record_pk: i64 },
    /// Log a message; a smoke test for queue plumbing.
    Echo { message: String },
}

impl JobType {
    pub fn job_type_name(&self) -> &'static str {
        match self {
            JobType::UpdateSearchVector { .. } => "update_search_vector",
            JobType::Echo { .. } => "echo",
        }
    }

    pub fn update_search_vector(record_pk: i64) -> Self {
        JobType::UpdateSearchVector {
            record_type: "record".to_string(),
            record_pk,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub priority: i32,
    pub parameters: serde_json::Value,
    pub error_message: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
}

impl Job {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Decode the typed payload serialized at enqueue time.
    pub fn job_type_params(&self) -> Result<JobType, serde_json::Error> {
        serde_json::from_value(self.parameters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_through_parameters() {
        let job_type = JobType::update_search_vector(42);
        let parameters = serde_json::to_value(&job_type).unwrap();
        let decoded: JobType = serde_json::from_value(parameters).unwrap();
        match decoded {
            JobType::UpdateSearchVector {
                record_type,
                record_pk,
            } => {
                assert_eq!(record_type, "record");
                assert_eq!(record_pk, 42);
            }
            other => panic!("unexpected job type: {:?}", other),
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            JobStatus::try_from("PENDING".to_string()).unwrap(),
            JobStatus::Pending
        );
        assert!(JobStatus::try_from("bogus".to_string()).is_err());
    }
}
