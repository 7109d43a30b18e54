//! In-memory stand-ins for the batch service and the object store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use vbatch_client::backend::{JobBackend, JobDefinitionInfo, JobQueueInfo, SubmitRequest};
use vbatch_client::error::{BackendError, Result};
use vbatch_client::store::{ObjectPath, ObjectStore};
use vbatch_core::constants::{defaults, job_definitions};
use vbatch_core::model::{JobId, JobStatus, JobSummary};

pub fn no_sleep(_: Duration) {}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An object store held in memory that counts existence checks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<HashSet<String>>,
    objects: Mutex<HashSet<ObjectPath>>,
    exists_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        guard(&store.buckets).insert(bucket.to_string());
        store
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn insert(&self, path: &str) {
        let path = ObjectPath::parse(path).expect("valid object path");
        guard(&self.objects).insert(path);
    }

    pub fn contains(&self, path: &str) -> bool {
        let path = ObjectPath::parse(path).expect("valid object path");
        guard(&self.objects).contains(&path)
    }

    /// Every stored object as `bucket/key`, sorted.
    pub fn objects(&self) -> Vec<String> {
        let mut all: Vec<String> = guard(&self.objects).iter().map(|p| p.to_string()).collect();
        all.sort();
        all
    }
}

impl ObjectStore for MemoryStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(guard(&self.buckets).contains(bucket))
    }

    fn exists(&self, path: &ObjectPath) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if path.is_bucket() {
            return self.bucket_exists(&path.bucket);
        }
        Ok(guard(&self.objects).contains(path))
    }

    fn put(&self, path: &ObjectPath) -> Result<()> {
        if !guard(&self.buckets).contains(&path.bucket) {
            return Err(BackendError::new("memory", "put-object", "NoSuchBucket", &path.bucket).into());
        }
        guard(&self.objects).insert(path.clone());
        Ok(())
    }

    fn delete(&self, path: &ObjectPath) -> Result<()> {
        guard(&self.objects).remove(path);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ScriptedJob {
    queue: String,
    id: JobId,
    name: String,
    timeline: Vec<JobStatus>,
    added_at: usize,
    terminated: bool,
}

impl ScriptedJob {
    fn step(&self, sweeps: usize) -> usize {
        let step = sweeps.saturating_sub(1).saturating_sub(self.added_at);
        step.min(self.timeline.len().saturating_sub(1))
    }

    fn status(&self, sweeps: usize) -> JobStatus {
        if self.terminated {
            return JobStatus::Failed;
        }
        self.timeline
            .get(self.step(sweeps))
            .copied()
            .unwrap_or(JobStatus::Submitted)
    }

    fn previous_status(&self, sweeps: usize) -> Option<JobStatus> {
        let step = self.step(sweeps);
        if self.terminated || step == 0 {
            return None;
        }
        self.timeline.get(step - 1).copied()
    }
}

#[derive(Debug, Default)]
struct BackendState {
    definitions: Vec<JobDefinitionInfo>,
    queues: Vec<JobQueueInfo>,
    scripts: Vec<(String, Vec<JobStatus>)>,
    jobs: Vec<ScriptedJob>,
    submissions: Vec<SubmitRequest>,
    terminated: Vec<(JobId, String)>,
    fail_submit_suffix: Option<String>,
    fail_terminate: bool,
    stale_listings: bool,
    sweeps: usize,
    next_id: usize,
}

/// A batch service whose jobs follow scripted status timelines. A listing
/// for SUBMITTED starts a new sweep, and every job moves one step along its
/// timeline per sweep.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<BackendState>,
}

impl ScriptedBackend {
    /// A backend offering the default queue and one ACTIVE default job
    /// definition.
    pub fn new() -> Self {
        Self::default()
            .with_definition(job_definitions::UBUNTU14_GCC, "ACTIVE")
            .with_queue(defaults::JOB_QUEUE)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_definition(self, name: &str, status: &str) -> Self {
        {
            let mut state = guard(&self.state);
            let revision = state.definitions.len() as u32 + 1;
            state.definitions.push(JobDefinitionInfo {
                name: name.to_string(),
                revision,
                status: Some(status.to_string()),
            });
        }
        self
    }

    pub fn with_queue(self, name: &str) -> Self {
        guard(&self.state).queues.push(JobQueueInfo {
            name: name.to_string(),
            state: Some("ENABLED".to_string()),
        });
        self
    }

    /// Jobs submitted later whose names end in `suffix` follow `timeline`.
    pub fn script(self, suffix: &str, timeline: &[JobStatus]) -> Self {
        guard(&self.state)
            .scripts
            .push((suffix.to_string(), timeline.to_vec()));
        self
    }

    pub fn fail_submission_of(self, suffix: &str) -> Self {
        guard(&self.state).fail_submit_suffix = Some(suffix.to_string());
        self
    }

    pub fn fail_terminations(self) -> Self {
        guard(&self.state).fail_terminate = true;
        self
    }

    /// Each job is also listed under the status it just left, as when a job
    /// moves while a sweep is in progress.
    pub fn with_stale_listings(self) -> Self {
        guard(&self.state).stale_listings = true;
        self
    }

    pub fn add_job(&self, queue: &str, id: &str, name: &str, timeline: &[JobStatus]) {
        let mut state = guard(&self.state);
        let added_at = state.sweeps;
        state.jobs.push(ScriptedJob {
            queue: queue.to_string(),
            id: JobId::from(id),
            name: name.to_string(),
            timeline: timeline.to_vec(),
            added_at,
            terminated: false,
        });
    }

    pub fn submissions(&self) -> Vec<SubmitRequest> {
        guard(&self.state).submissions.clone()
    }

    pub fn terminated(&self) -> Vec<(JobId, String)> {
        guard(&self.state).terminated.clone()
    }

    pub fn sweeps(&self) -> usize {
        guard(&self.state).sweeps
    }
}

fn default_timeline() -> Vec<JobStatus> {
    vec![
        JobStatus::Submitted,
        JobStatus::Runnable,
        JobStatus::Running,
        JobStatus::Succeeded,
    ]
}

impl JobBackend for ScriptedBackend {
    fn describe_job_definitions(&self, name: &str) -> Result<Vec<JobDefinitionInfo>> {
        Ok(guard(&self.state)
            .definitions
            .iter()
            .filter(|d| d.name == name)
            .cloned()
            .collect())
    }

    fn describe_job_queues(&self, name: &str) -> Result<Vec<JobQueueInfo>> {
        Ok(guard(&self.state)
            .queues
            .iter()
            .filter(|q| q.name == name)
            .cloned()
            .collect())
    }

    fn submit_job(&self, request: &SubmitRequest) -> Result<JobSummary> {
        let mut state = guard(&self.state);
        if let Some(suffix) = &state.fail_submit_suffix {
            if request.job_name.ends_with(suffix.as_str()) {
                return Err(BackendError::new(
                    "batch",
                    "submit-job",
                    "ClientException",
                    format!("refusing to submit {}", request.job_name),
                )
                .into());
            }
        }

        state.next_id += 1;
        let id = JobId(format!("job-{:04}", state.next_id));
        let timeline = state
            .scripts
            .iter()
            .find(|(suffix, _)| request.job_name.ends_with(suffix.as_str()))
            .map(|(_, timeline)| timeline.clone())
            .unwrap_or_else(default_timeline);
        let added_at = state.sweeps;
        state.jobs.push(ScriptedJob {
            queue: request.job_queue.clone(),
            id: id.clone(),
            name: request.job_name.clone(),
            timeline,
            added_at,
            terminated: false,
        });
        state.submissions.push(request.clone());

        Ok(JobSummary {
            id,
            name: request.job_name.clone(),
        })
    }

    fn list_jobs(&self, queue: &str, status: JobStatus) -> Result<Vec<JobSummary>> {
        let mut state = guard(&self.state);
        if status == JobStatus::ALL[0] {
            state.sweeps += 1;
        }
        let sweeps = state.sweeps;
        let stale = state.stale_listings;
        Ok(state
            .jobs
            .iter()
            .filter(|job| job.queue == queue)
            .filter(|job| {
                job.status(sweeps) == status
                    || (stale && job.previous_status(sweeps) == Some(status))
            })
            .map(|job| JobSummary {
                id: job.id.clone(),
                name: job.name.clone(),
            })
            .collect())
    }

    fn terminate_job(&self, id: &JobId, reason: &str) -> Result<()> {
        let mut state = guard(&self.state);
        if state.fail_terminate {
            return Err(BackendError::new(
                "batch",
                "terminate-job",
                "ServerException",
                format!("cannot terminate {}", id),
            )
            .into());
        }
        if let Some(job) = state.jobs.iter_mut().find(|job| &job.id == id) {
            job.terminated = true;
        }
        state.terminated.push((id.clone(), reason.to_string()));
        Ok(())
    }
}
