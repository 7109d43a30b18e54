use crate::constants::locks;
use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Build,
    Property,
    Coverage,
    Report,
}

impl Phase {
    /// Submission order. Every phase appears after the phases it may depend on.
    pub const ALL: [Phase; 4] = [Phase::Build, Phase::Property, Phase::Coverage, Phase::Report];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Build => "build",
            Phase::Property => "property",
            Phase::Coverage => "coverage",
            Phase::Report => "report",
        }
    }

    pub fn lock_name(&self) -> &'static str {
        match self {
            Phase::Build => locks::BUILD,
            Phase::Property => locks::PROPERTY,
            Phase::Coverage => locks::COVERAGE,
            Phase::Report => locks::REPORT,
        }
    }

    pub fn command_flag(&self) -> &'static str {
        match self {
            Phase::Build => "--dobuild",
            Phase::Property => "--doproperty",
            Phase::Coverage => "--docoverage",
            Phase::Report => "--doreport",
        }
    }

    pub fn job_name(&self, run_name: &str) -> String {
        format!("{}-{}", run_name, self.name())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Phase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Phase::Build),
            "property" => Ok(Phase::Property),
            "coverage" => Ok(Phase::Coverage),
            "report" => Ok(Phase::Report),
            _ => Err(DomainError::UnknownPhase(s.to_string())),
        }
    }
}

/// Backend job status. The declaration order is the lifecycle order, so `Ord`
/// can be used to pick the most advanced of two observations.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Submitted,
        JobStatus::Pending,
        JobStatus::Runnable,
        JobStatus::Starting,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Pending => "PENDING",
            JobStatus::Runnable => "RUNNABLE",
            JobStatus::Starting => "STARTING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "jobId")]
    pub id: JobId,
    #[serde(rename = "jobName")]
    pub name: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "jobId")]
    pub id: JobId,
    #[serde(rename = "jobName")]
    pub name: String,
    pub status: JobStatus,
}

/// The slot a phase occupies in a run result: both fields are `None` when the
/// phase was not scheduled.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PhaseJob {
    pub jobid: Option<JobId>,
    pub jobname: Option<String>,
}

impl PhaseJob {
    pub fn submitted(jobid: JobId, jobname: String) -> Self {
        Self {
            jobid: Some(jobid),
            jobname: Some(jobname),
        }
    }

    pub fn not_scheduled() -> Self {
        Self::default()
    }

    pub fn is_scheduled(&self) -> bool {
        self.jobid.is_some()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub jobname: String,
    pub build: PhaseJob,
    pub property: PhaseJob,
    pub coverage: PhaseJob,
    pub report: PhaseJob,
}

impl RunResult {
    pub fn new(jobname: impl Into<String>) -> Self {
        Self {
            jobname: jobname.into(),
            build: PhaseJob::not_scheduled(),
            property: PhaseJob::not_scheduled(),
            coverage: PhaseJob::not_scheduled(),
            report: PhaseJob::not_scheduled(),
        }
    }

    pub fn phase(&self, phase: Phase) -> &PhaseJob {
        match phase {
            Phase::Build => &self.build,
            Phase::Property => &self.property,
            Phase::Coverage => &self.coverage,
            Phase::Report => &self.report,
        }
    }

    pub fn phase_mut(&mut self, phase: Phase) -> &mut PhaseJob {
        match phase {
            Phase::Build => &mut self.build,
            Phase::Property => &mut self.property,
            Phase::Coverage => &mut self.coverage,
            Phase::Report => &mut self.report,
        }
    }

    pub fn job_id(&self, phase: Phase) -> Option<&JobId> {
        self.phase(phase).jobid.as_ref()
    }

    pub fn submitted_ids(&self) -> Vec<&JobId> {
        Phase::ALL
            .iter()
            .filter_map(|phase| self.job_id(*phase))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Error,
    Failure,
    Success,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Error => "error",
            CommitState::Failure => "failure",
            CommitState::Success => "success",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_str_roundtrip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_str(phase.name()).unwrap(), phase);
        }
        assert!(Phase::from_str("Build").is_err());
    }

    #[test]
    fn test_phase_job_name() {
        assert_eq!(
            Phase::Coverage.job_name("cbmc-20240101-000000"),
            "cbmc-20240101-000000-coverage"
        );
    }

    #[test]
    fn test_status_order_follows_lifecycle() {
        assert!(JobStatus::Submitted < JobStatus::Running);
        assert!(JobStatus::Running < JobStatus::Succeeded);
        assert!(JobStatus::Running < JobStatus::Failed);
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = JobStatus::ALL
            .into_iter()
            .filter(JobStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![JobStatus::Succeeded, JobStatus::Failed]);
    }

    #[test]
    fn test_status_serde_uses_backend_names() {
        let json = serde_json::to_string(&JobStatus::Runnable).unwrap();
        assert_eq!(json, "\"RUNNABLE\"");
        let status: JobStatus = serde_json::from_str("\"STARTING\"").unwrap();
        assert_eq!(status, JobStatus::Starting);
    }

    #[test]
    fn test_run_result_serializes_nulls_for_unscheduled_phases() {
        let mut result = RunResult::new("cbmc-x");
        *result.phase_mut(Phase::Build) = PhaseJob::submitted(JobId::from("id-1"), "cbmc-x-build".into());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["jobname"], "cbmc-x");
        assert_eq!(value["build"]["jobid"], "id-1");
        assert_eq!(value["build"]["jobname"], "cbmc-x-build");
        assert!(value["coverage"]["jobid"].is_null());
        assert!(value["coverage"]["jobname"].is_null());
        assert_eq!(result.submitted_ids(), vec![&JobId::from("id-1")]);
    }
}
