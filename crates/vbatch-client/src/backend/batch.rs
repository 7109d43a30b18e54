use super::{JobBackend, JobDefinitionInfo, JobQueueInfo, SubmitRequest};
use crate::aws::AwsCli;
use crate::error::{ClientError, Result};
use serde::Deserialize;
use serde_json::json;
use vbatch_core::model::{JobId, JobStatus, JobSummary};

const SERVICE: &str = "batch";

#[derive(Deserialize)]
struct DefinitionsResponse {
    #[serde(rename = "jobDefinitions", default)]
    job_definitions: Vec<JobDefinitionInfo>,
}

#[derive(Deserialize)]
struct QueuesResponse {
    #[serde(rename = "jobQueues", default)]
    job_queues: Vec<JobQueueInfo>,
}

#[derive(Deserialize)]
struct ListJobsResponse {
    #[serde(rename = "jobSummaryList", default)]
    job_summary_list: Vec<JobSummary>,
}

/// AWS Batch reached through the `aws` command line.
#[derive(Debug, Clone)]
pub struct AwsCliBatch {
    cli: AwsCli,
}

impl AwsCliBatch {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

fn json_arg(operation: &str, value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|source| ClientError::MalformedResponse {
        operation: format!("{} {}", SERVICE, operation),
        source,
    })
}

pub(crate) fn submit_args(request: &SubmitRequest) -> Result<Vec<String>> {
    let depends_on: Vec<_> = request
        .depends_on
        .iter()
        .map(|id| json!({ "jobId": id.0 }))
        .collect();
    let overrides = json!({
        "command": request.command,
        "memory": request.memory,
    });

    Ok(vec![
        "--job-name".to_string(),
        request.job_name.clone(),
        "--job-queue".to_string(),
        request.job_queue.clone(),
        "--job-definition".to_string(),
        request.job_definition.clone(),
        "--depends-on".to_string(),
        json_arg("submit-job", &json!(depends_on))?,
        "--container-overrides".to_string(),
        json_arg("submit-job", &overrides)?,
    ])
}

impl JobBackend for AwsCliBatch {
    fn describe_job_definitions(&self, name: &str) -> Result<Vec<JobDefinitionInfo>> {
        let response: DefinitionsResponse = self.cli.run_json(
            SERVICE,
            "describe-job-definitions",
            &["--job-definition-name".to_string(), name.to_string()],
        )?;
        Ok(response.job_definitions)
    }

    fn describe_job_queues(&self, name: &str) -> Result<Vec<JobQueueInfo>> {
        let response: QueuesResponse = self.cli.run_json(
            SERVICE,
            "describe-job-queues",
            &["--job-queues".to_string(), name.to_string()],
        )?;
        Ok(response.job_queues)
    }

    fn submit_job(&self, request: &SubmitRequest) -> Result<JobSummary> {
        let args = submit_args(request)?;
        self.cli.run_json(SERVICE, "submit-job", &args)
    }

    fn list_jobs(&self, queue: &str, status: JobStatus) -> Result<Vec<JobSummary>> {
        let response: ListJobsResponse = self.cli.run_json(
            SERVICE,
            "list-jobs",
            &[
                "--job-queue".to_string(),
                queue.to_string(),
                "--job-status".to_string(),
                status.as_str().to_string(),
            ],
        )?;
        Ok(response.job_summary_list)
    }

    fn terminate_job(&self, id: &JobId, reason: &str) -> Result<()> {
        self.cli.run(
            SERVICE,
            "terminate-job",
            &[
                "--job-id".to_string(),
                id.0.clone(),
                "--reason".to_string(),
                reason.to_string(),
            ],
        )?;
        Ok(())
    }
}
