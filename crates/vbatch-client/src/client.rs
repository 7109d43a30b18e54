use crate::{
    aws::AwsCli,
    backend::{AwsCliBatch, JobBackend},
    error::Result,
    lock::Lock,
    orchestrator,
    report::{CommitStatus, GhCliReporter, LogReporter, StatusReporter},
    status::{self, JobFilter},
    store::{AwsCliS3, FsStore, ObjectStore, Sleeper},
};
use std::sync::Arc;
use std::time::Duration;
use vbatch_core::{
    config::{Config, RunOptions, StoreKind},
    constants::defaults,
    engine::StatusChange,
    errors::ConfigError,
    model::{CommitState, JobId, JobRecord, RunResult},
};

#[derive(Clone)]
pub struct Client {
    pub(crate) config: Arc<Config>,
    pub(crate) backend: Arc<dyn JobBackend>,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) reporter: Arc<dyn StatusReporter>,
    pub(crate) sleep: Sleeper,
}

impl Client {
    /// A client talking to AWS in `region`, with the store and commit-status
    /// reporter chosen by `config`.
    pub fn new(config: Config, region: &str) -> Result<Self> {
        let cli = AwsCli::new(region);
        let backend: Arc<dyn JobBackend> = Arc::new(AwsCliBatch::new(cli.clone()));

        let store: Arc<dyn ObjectStore> = match config.store.kind {
            StoreKind::S3 => Arc::new(AwsCliS3::new(cli)),
            StoreKind::Fs => {
                let root = config.store.expanded_root()?.ok_or_else(|| {
                    ConfigError::General(
                        "store.root must be set when store.kind = \"fs\"".to_string(),
                    )
                })?;
                tracing::debug!("Using filesystem store at {}", root.display());
                Arc::new(FsStore::new(root))
            }
        };

        let reporter: Arc<dyn StatusReporter> = if config.github.enabled {
            let repo = config.github.repo.clone().ok_or_else(|| {
                ConfigError::General(
                    "github.repo must be set when github.enabled = true".to_string(),
                )
            })?;
            Arc::new(GhCliReporter::new(repo))
        } else {
            Arc::new(LogReporter)
        };

        Ok(Self::with_parts(config, backend, store, reporter))
    }

    pub fn with_parts(
        config: Config,
        backend: Arc<dyn JobBackend>,
        store: Arc<dyn ObjectStore>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            store,
            reporter,
            sleep: std::thread::sleep,
        }
    }

    pub fn with_sleeper(mut self, sleep: Sleeper) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn submit(&self, opts: &RunOptions, validate: bool) -> Result<RunResult> {
        if validate {
            orchestrator::validate_resources(self.backend.as_ref(), &opts.jobdef, &opts.jobqueue)?;
        }
        orchestrator::submit_jobs(self.backend.as_ref(), opts)
    }

    pub fn poll(&self, queue: &str, filter: &JobFilter) -> Result<Vec<JobRecord>> {
        status::poll_once(self.backend.as_ref(), queue, filter)
    }

    pub fn monitor<F>(&self, queue: &str, filter: &JobFilter, on_change: F) -> Result<Vec<JobRecord>>
    where
        F: FnMut(&[StatusChange], &[JobRecord]),
    {
        let interval = Duration::from_secs(self.config.poll.monitor_interval());
        status::monitor(
            self.backend.as_ref(),
            queue,
            filter,
            interval,
            self.sleep,
            on_change,
        )
    }

    pub fn kill(&self, queue: &str, filter: &JobFilter) -> Result<Vec<JobId>> {
        status::kill(
            self.backend.as_ref(),
            queue,
            filter,
            defaults::TERMINATE_REASON,
        )
    }

    /// Locks rooted at `path`, usually a run's workspace prefix.
    pub fn lock(&self, path: &str) -> Result<Lock> {
        Ok(Lock::new(self.store.clone(), path)?.with_sleeper(self.sleep))
    }

    pub fn report(
        &self,
        sha: &str,
        ctx: &str,
        jobname: &str,
        state: CommitState,
    ) -> Result<CommitStatus> {
        let status = CommitStatus::for_run(&self.config.github, ctx, jobname, state);
        self.reporter.post(sha, &status)?;
        Ok(status)
    }
}
