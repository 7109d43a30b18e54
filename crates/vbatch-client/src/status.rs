use crate::backend::JobBackend;
use crate::error::{ClientError, Result};
use crate::store::Sleeper;
use chrono::Utc;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets, Attribute, Cell, Color, Table};
use regex::Regex;
use std::time::Duration;
use vbatch_core::engine::{merge_sweep, StatusChange, StatusTracker};
use vbatch_core::model::{JobId, JobRecord, JobStatus, JobSummary, Phase, RunResult};

/// Selects jobs by id or by name. Patterns are searched for anywhere in the
/// id or name; a filter with neither pattern selects nothing.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    id: Option<Regex>,
    name: Option<Regex>,
}

impl JobFilter {
    pub fn new(id: Option<&str>, name: Option<&str>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| ClientError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        };
        Ok(Self {
            id: id.map(compile).transpose()?,
            name: name.map(compile).transpose()?,
        })
    }

    /// Every phase job of a run, by its `<run>-<phase>` names. Runs whose
    /// names extend this one (`<run>-2-build`) are not selected.
    pub fn for_run(jobname: &str) -> Result<Self> {
        let phases: Vec<&str> = Phase::ALL.iter().map(|p| p.name()).collect();
        Self::new(
            None,
            Some(&format!(
                "^{}-(?:{})$",
                regex::escape(jobname),
                phases.join("|")
            )),
        )
    }

    /// Exactly the jobs submitted for `result`.
    pub fn for_result(result: &RunResult) -> Result<Self> {
        let ids: Vec<String> = result
            .submitted_ids()
            .iter()
            .map(|id| regex::escape(&id.0))
            .collect();
        if ids.is_empty() {
            return Ok(Self::default());
        }
        Self::new(Some(&format!("^(?:{})$", ids.join("|"))), None)
    }

    pub fn matches(&self, job: &JobSummary) -> bool {
        self.id.as_ref().is_some_and(|re| re.is_match(&job.id.0))
            || self.name.as_ref().is_some_and(|re| re.is_match(&job.name))
    }
}

/// One sweep over every status value, merged to one record per job.
pub fn poll_once(backend: &dyn JobBackend, queue: &str, filter: &JobFilter) -> Result<Vec<JobRecord>> {
    let mut found = Vec::new();
    for status in JobStatus::ALL {
        for job in backend.list_jobs(queue, status)? {
            if filter.matches(&job) {
                found.push(JobRecord {
                    id: job.id,
                    name: job.name,
                    status,
                });
            }
        }
    }
    Ok(merge_sweep(found))
}

/// Polls until every job seen is terminal. `on_change` receives the jobs
/// whose status changed in a poll together with the full current view.
pub fn monitor<F>(
    backend: &dyn JobBackend,
    queue: &str,
    filter: &JobFilter,
    interval: Duration,
    sleep: Sleeper,
    mut on_change: F,
) -> Result<Vec<JobRecord>>
where
    F: FnMut(&[StatusChange], &[JobRecord]),
{
    let mut tracker = StatusTracker::new();
    loop {
        let records = poll_once(backend, queue, filter)?;
        let changes = tracker.observe(&records, Utc::now());
        if !changes.is_empty() {
            for change in &changes {
                tracing::info!(
                    "{} ({}): {} -> {}",
                    change.name,
                    change.id,
                    change
                        .previous
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    change.current
                );
            }
            on_change(&changes, &tracker.records());
        }
        if tracker.is_converged() {
            if tracker.is_empty() {
                tracing::warn!("No jobs matched on queue {}", queue);
            }
            return Ok(tracker.records());
        }
        sleep(interval);
    }
}

/// Terminates every matching job and returns their ids.
pub fn kill(
    backend: &dyn JobBackend,
    queue: &str,
    filter: &JobFilter,
    reason: &str,
) -> Result<Vec<JobId>> {
    let ids: Vec<JobId> = poll_once(backend, queue, filter)?
        .into_iter()
        .map(|r| r.id)
        .collect();

    for id in &ids {
        tracing::info!("Terminating job {}", id);
        backend.terminate_job(id, reason).map_err(|e| match e {
            ClientError::Backend(source) => ClientError::TerminateFailed {
                ids: ids.iter().map(|i| i.0.clone()).collect(),
                source,
            },
            other => other,
        })?;
    }
    Ok(ids)
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Succeeded => Color::Green,
        JobStatus::Failed => Color::Red,
        JobStatus::Running | JobStatus::Starting => Color::Cyan,
        _ => Color::Yellow,
    }
}

pub fn render_status_table(records: &[JobRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Job Name").add_attribute(Attribute::Bold),
            Cell::new("Job ID").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(&record.id.0),
            Cell::new(record.status.as_str()).fg(status_color(record.status)),
        ]);
    }
    table
}
