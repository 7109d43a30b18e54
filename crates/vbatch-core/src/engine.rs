use crate::config::RunOptions;
use crate::errors::ConfigError;
use crate::model::{CommitState, JobId, JobRecord, JobStatus, Phase, RunResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What gets submitted for one enabled phase of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub phase: Phase,
    pub jobname: String,
    pub memory: u32,
    pub command: Vec<String>,
}

/// Enabled phases of a run in submission order. Disabled phases are simply
/// absent.
pub fn plan_run(opts: &RunOptions) -> Result<Vec<PhasePlan>, ConfigError> {
    let options_json = opts.to_json()?;
    Ok(Phase::ALL
        .into_iter()
        .filter(|phase| opts.enabled(*phase))
        .map(|phase| PhasePlan {
            phase,
            jobname: phase.job_name(&opts.jobname),
            memory: opts.memory(phase),
            command: phase_command(opts, phase, &options_json),
        })
        .collect())
}

/// Subcommand of the runner binary, the job definition's entrypoint, that
/// executes a phase inside its container.
pub const PHASE_SUBCOMMAND: &str = "internal-phase";

/// Container command for a phase job: arguments to the runner entrypoint.
pub fn phase_command(opts: &RunOptions, phase: Phase, options_json: &str) -> Vec<String> {
    vec![
        PHASE_SUBCOMMAND.to_string(),
        "--jsons".to_string(),
        options_json.to_string(),
        phase.command_flag().to_string(),
        "--jobname".to_string(),
        phase.job_name(&opts.jobname),
        "--region".to_string(),
        opts.region.clone(),
    ]
}

/// One tool invocation of a phase. Standard output goes to `output` in the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStep {
    pub program: String,
    pub args: Vec<String>,
    pub output: String,
    /// A nonzero exit is a verification verdict, not a failure.
    pub verdict_exit: bool,
}

impl ToolStep {
    fn new(program: &str, args: Vec<String>, output: &str) -> Self {
        Self {
            program: program.to_string(),
            args,
            output: output.to_string(),
            verdict_exit: false,
        }
    }

    fn verdict(mut self) -> Self {
        self.verdict_exit = true;
        self
    }

    pub fn words(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

pub const CHECKER: &str = "cbmc";
pub const VIEWER: &str = "cbmc-viewer";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|w| w.to_string()).collect()
}

fn checker_args(opts: &RunOptions, phase: Phase, extra: &[&str]) -> Vec<String> {
    std::iter::once(opts.goto.clone())
        .chain(opts.checker_flags(phase).map(|f| f.to_words()).unwrap_or_default())
        .chain(owned(extra))
        .collect()
}

/// Tool invocations a phase runs when its job is given no explicit command.
pub fn tool_steps(opts: &RunOptions, phase: Phase) -> Vec<ToolStep> {
    match phase {
        Phase::Build => vec![ToolStep::new("make", vec![opts.goto.clone()], "build.txt")],
        Phase::Property => vec![
            ToolStep::new(CHECKER, checker_args(opts, phase, &["--trace"]), "cbmc.txt").verdict(),
            ToolStep::new(
                CHECKER,
                checker_args(opts, phase, &["--show-properties", "--xml-ui"]),
                "property.xml",
            ),
        ],
        Phase::Coverage => vec![ToolStep::new(
            CHECKER,
            checker_args(opts, phase, &["--cover", "location", "--xml-ui"]),
            "coverage.xml",
        )
        .verdict()],
        Phase::Report => vec![ToolStep::new(
            VIEWER,
            [
                owned(&["--srcdir", ".", "--htmldir", "html", "--goto"]),
                vec![opts.goto.clone()],
                owned(&[
                    "--result",
                    "cbmc.txt",
                    "--property",
                    "property.xml",
                    "--block",
                    "coverage.xml",
                    "--blddir",
                    ".",
                    "--json-summary",
                    "summary.json",
                ]),
            ]
            .concat(),
            "report.txt",
        )],
    }
}

/// Predecessor job ids of `phase`, given the phases already submitted.
///
/// Property and coverage wait on build when it ran. Report waits on
/// whichever of property and coverage ran, in that order; the list is empty
/// when neither did.
pub fn dependencies_for(phase: Phase, submitted: &RunResult) -> Vec<JobId> {
    let upstream: &[Phase] = match phase {
        Phase::Build => &[],
        Phase::Property | Phase::Coverage => &[Phase::Build],
        Phase::Report => &[Phase::Property, Phase::Coverage],
    };
    upstream
        .iter()
        .filter_map(|p| submitted.job_id(*p).cloned())
        .collect()
}

/// Collapses one status sweep into a record per job id. A job observed under
/// two statuses in the same sweep keeps the most advanced one.
pub fn merge_sweep(records: impl IntoIterator<Item = JobRecord>) -> Vec<JobRecord> {
    let mut by_id: BTreeMap<JobId, JobRecord> = BTreeMap::new();
    for record in records {
        match by_id.get_mut(&record.id) {
            Some(existing) if existing.status >= record.status => {}
            Some(existing) => *existing = record,
            None => {
                by_id.insert(record.id.clone(), record);
            }
        }
    }
    by_id.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// When the poll that saw the change ran.
    pub at: DateTime<Utc>,
    pub id: JobId,
    pub name: String,
    pub previous: Option<JobStatus>,
    pub current: JobStatus,
}

/// Last known status of every job seen by a monitor.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    jobs: BTreeMap<JobId, JobRecord>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a poll taken at `at` and returns the jobs whose status differs
    /// from the recorded one.
    pub fn observe(&mut self, records: &[JobRecord], at: DateTime<Utc>) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for record in records {
            let previous = self.jobs.get(&record.id).map(|r| r.status);
            if previous == Some(record.status) {
                continue;
            }
            changes.push(StatusChange {
                at,
                id: record.id.clone(),
                name: record.name.clone(),
                previous,
                current: record.status,
            });
            self.jobs.insert(record.id.clone(), record.clone());
        }
        changes
    }

    /// True once every tracked job is terminal; trivially true when nothing
    /// is tracked.
    pub fn is_converged(&self) -> bool {
        self.jobs.values().all(|r| r.status.is_terminal())
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn records(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        records
    }
}

/// Commit state for a run. `submitted` is false when orchestration failed
/// before any job could run.
pub fn determine_commit_state(submitted: bool, records: &[JobRecord]) -> CommitState {
    if !submitted {
        return CommitState::Error;
    }
    if records.iter().any(|r| r.status == JobStatus::Failed) {
        return CommitState::Failure;
    }
    if !records.is_empty() && records.iter().all(|r| r.status == JobStatus::Succeeded) {
        return CommitState::Success;
    }
    CommitState::Pending
}
