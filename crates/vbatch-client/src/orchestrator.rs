use crate::backend::{JobBackend, SubmitRequest};
use crate::error::{ClientError, Result};
use vbatch_core::config::RunOptions;
use vbatch_core::engine;
use vbatch_core::errors::DomainError;
use vbatch_core::model::{Phase, PhaseJob, RunResult};

/// Confirms that exactly one ACTIVE job definition and exactly one job queue
/// carry the configured names.
pub fn validate_resources(backend: &dyn JobBackend, jobdef: &str, jobqueue: &str) -> Result<()> {
    let active = backend
        .describe_job_definitions(jobdef)?
        .into_iter()
        .filter(|d| d.name == jobdef && d.is_active())
        .count();
    match active {
        0 => return Err(DomainError::DefinitionNotFound(jobdef.to_string()).into()),
        1 => {}
        _ => return Err(DomainError::DuplicateDefinition(jobdef.to_string()).into()),
    }

    let queues = backend
        .describe_job_queues(jobqueue)?
        .into_iter()
        .filter(|q| q.name == jobqueue)
        .count();
    match queues {
        0 => Err(DomainError::QueueNotFound(jobqueue.to_string()).into()),
        1 => Ok(()),
        _ => Err(DomainError::AmbiguousQueue(jobqueue.to_string()).into()),
    }
}

/// Submits every enabled phase in order, wiring each job to the jobs it
/// depends on. The first failing submission aborts the run; jobs already
/// submitted are left alone and returned inside
/// [`ClientError::SubmissionAborted`].
pub fn submit_jobs(backend: &dyn JobBackend, opts: &RunOptions) -> Result<RunResult> {
    let plans = engine::plan_run(opts)?;
    let mut result = RunResult::new(opts.jobname.clone());

    for plan in plans {
        let depends_on = engine::dependencies_for(plan.phase, &result);
        let request = SubmitRequest {
            job_name: plan.jobname,
            job_queue: opts.jobqueue.clone(),
            job_definition: opts.jobdef.clone(),
            depends_on,
            command: plan.command,
            memory: plan.memory,
        };

        tracing::info!(
            "Submitting {} as {} (depends on [{}])",
            plan.phase,
            request.job_name,
            request
                .depends_on
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let summary = match backend.submit_job(&request) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Submitting {} failed: {}", request.job_name, e);
                if result.submitted_ids().is_empty() {
                    return Err(e);
                }
                for phase in Phase::ALL {
                    if let Some(id) = result.job_id(phase) {
                        tracing::warn!("{} was already submitted as {}", phase, id);
                    }
                }
                return Err(ClientError::SubmissionAborted {
                    job_name: request.job_name,
                    submitted: Box::new(result),
                    source: Box::new(e),
                });
            }
        };
        tracing::debug!("{} submitted with id {}", summary.name, summary.id);
        *result.phase_mut(plan.phase) = PhaseJob::submitted(summary.id, summary.name);
    }

    Ok(result)
}
