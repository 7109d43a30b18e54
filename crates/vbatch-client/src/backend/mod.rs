use crate::error::Result;
use serde::{Deserialize, Serialize};
use vbatch_core::model::{JobId, JobStatus, JobSummary};

pub mod batch;

pub use batch::AwsCliBatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinitionInfo {
    #[serde(rename = "jobDefinitionName")]
    pub name: String,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub status: Option<String>,
}

impl JobDefinitionInfo {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("ACTIVE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQueueInfo {
    #[serde(rename = "jobQueueName")]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    pub depends_on: Vec<JobId>,
    pub command: Vec<String>,
    pub memory: u32,
}

/// The batch service that runs phase jobs.
pub trait JobBackend: Send + Sync {
    fn describe_job_definitions(&self, name: &str) -> Result<Vec<JobDefinitionInfo>>;

    fn describe_job_queues(&self, name: &str) -> Result<Vec<JobQueueInfo>>;

    fn submit_job(&self, request: &SubmitRequest) -> Result<JobSummary>;

    /// Jobs currently in `status` on `queue`.
    fn list_jobs(&self, queue: &str, status: JobStatus) -> Result<Vec<JobSummary>>;

    fn terminate_job(&self, id: &JobId, reason: &str) -> Result<()>;
}
