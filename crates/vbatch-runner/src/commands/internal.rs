use crate::{cli::InternalPhaseArgs, commands::AppContext, error::CliError};
use chrono::Utc;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use vbatch_core::{
    config::{select_phase_command, OptionLayer, RunOptions},
    correlation::{CorrelationChain, TaskEntry, TaskStatus},
    engine::{tool_steps, ToolStep},
    errors::ConfigError,
    model::Phase,
};

fn append_entry(log: Option<&Path>, entry: &TaskEntry) -> Result<(), CliError> {
    let Some(path) = log else {
        return Ok(());
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", entry.to_json_line()?)?;
    Ok(())
}

/// Runs one phase inside its job container. The phase's lock is set only
/// when the phase succeeds. Once the STARTED entry is written, every exit
/// path writes a COMPLETED entry too.
pub fn handle_internal_phase(args: InternalPhaseArgs, context: &AppContext<'_>) -> Result<(), CliError> {
    let phase = select_phase_command(args.dobuild, args.doproperty, args.docoverage, args.doreport)?
        .ok_or_else(|| {
            ConfigError::General(
                "One of --dobuild, --doproperty, --docoverage, --doreport is required".to_string(),
            )
        })?;

    let layer = OptionLayer::from_json_sources(args.json.as_deref(), args.jsons.as_deref())?;
    let opts = RunOptions::resolve(layer, OptionLayer::from_config(context.config), Utc::now())?;
    let task_name = args
        .jobname
        .clone()
        .unwrap_or_else(|| phase.job_name(&opts.jobname));
    tracing::info!("Running {} phase of {} as {}", phase, opts.jobname, task_name);

    let chain = if args.correlation_list.is_empty() {
        CorrelationChain::root()
    } else {
        CorrelationChain::from_ids(args.correlation_list.clone()).child()
    };
    let log = args.task_log.as_deref();
    append_entry(
        log,
        &TaskEntry::new(&task_name, None, chain.clone(), TaskStatus::Started),
    )?;

    let outcome = run_phase(phase, &opts, &args, context);

    let status = if outcome.is_ok() {
        TaskStatus::CompletedSucceeded
    } else {
        TaskStatus::CompletedFailed
    };
    if let Err(e) = append_entry(log, &TaskEntry::new(&task_name, None, chain, status)) {
        // The phase's own error is the one worth reporting.
        if outcome.is_err() {
            tracing::error!("Can't record completion of {}: {}", task_name, e);
        } else {
            return Err(e);
        }
    }
    outcome?;

    tracing::info!("{} phase of {} finished", phase, opts.jobname);
    Ok(())
}

fn run_phase(
    phase: Phase,
    opts: &RunOptions,
    args: &InternalPhaseArgs,
    context: &AppContext<'_>,
) -> Result<(), CliError> {
    let client = context.client()?;
    let lock = client.lock(&opts.wsbucket)?;

    if let Some(upstream) = &args.wait_for {
        let upstream: Phase = upstream.parse()?;
        lock.wait_for_set(
            upstream.lock_name(),
            context.config.poll.lock_interval(),
            args.bound.as_deref(),
        )?;
    }

    match args.command.split_first() {
        Some((program, rest)) => {
            let mut cmd = Command::new(program);
            cmd.args(rest);
            run_command(phase, cmd, program, false)?;
        }
        None => {
            for step in tool_steps(opts, phase) {
                run_step(phase, &step)?;
            }
        }
    }

    lock.set(phase.lock_name())?;
    Ok(())
}

fn run_step(phase: Phase, step: &ToolStep) -> Result<(), CliError> {
    let output = std::fs::File::create(&step.output).map_err(|e| CliError::PhaseFailed {
        phase: phase.to_string(),
        message: format!("can't create '{}': {}", step.output, e),
    })?;
    let mut cmd = Command::new(&step.program);
    cmd.args(&step.args).stdout(Stdio::from(output));
    run_command(phase, cmd, &step.program, step.verdict_exit)
}

fn run_command(phase: Phase, mut cmd: Command, program: &str, verdict_exit: bool) -> Result<(), CliError> {
    vbatch_core::logging::log_and_print_command(&cmd);
    match cmd.status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) if verdict_exit && status.code().is_some() => {
            tracing::info!("{} reported verdict {}", program, status);
            Ok(())
        }
        Ok(status) => Err(CliError::PhaseFailed {
            phase: phase.to_string(),
            message: format!("command exited with {}", status),
        }),
        Err(e) => Err(CliError::PhaseFailed {
            phase: phase.to_string(),
            message: format!("can't run '{}': {}", program, e),
        }),
    }
}
