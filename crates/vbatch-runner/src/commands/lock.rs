use crate::{
    cli::{LockAction, LockArgs},
    commands::AppContext,
    error::CliError,
};
use colored::Colorize;
use vbatch_core::constants::{defaults, store};
use vbatch_core::errors::ConfigError;

/// The lock prefix: `--path`, or the workspace prefix of `--jobname`.
fn lock_prefix(args: &LockArgs, context: &AppContext<'_>) -> Result<String, CliError> {
    if let Some(path) = &args.path {
        return Ok(path.clone());
    }
    let jobname = args.jobname.as_deref().ok_or_else(|| {
        ConfigError::General("Either --path or --jobname is required".to_string())
    })?;
    let bucket = context
        .config
        .store
        .bucket
        .as_deref()
        .unwrap_or(defaults::BUCKET);
    Ok(format!("{}/{}/{}", bucket.trim_end_matches('/'), jobname, store::WS))
}

pub fn handle_lock(args: LockArgs, context: &AppContext<'_>) -> Result<(), CliError> {
    let prefix = lock_prefix(&args, context)?;
    let client = context.client()?;
    let lock = client.lock(&prefix)?;
    let interval = args
        .interval
        .unwrap_or_else(|| context.config.poll.lock_interval());
    let bound = args.bound.as_deref();

    match args.action {
        LockAction::Set => {
            lock.set(&args.name)?;
            println!("{} {}", "SET".green().bold(), lock.lock_path(&args.name)?);
        }
        LockAction::Unset => {
            lock.unset(&args.name)?;
            println!("{} {}", "UNSET".yellow().bold(), lock.lock_path(&args.name)?);
        }
        LockAction::IsSet => println!("{}", lock.is_set(&args.name)?),
        LockAction::IsUnset => println!("{}", lock.is_unset(&args.name)?),
        LockAction::WaitSet | LockAction::WaitUnset => {
            let wanted = if args.action == LockAction::WaitSet {
                "set"
            } else {
                "unset"
            };
            let pb = super::spinner(format!("Waiting for {} to be {}...", args.name, wanted));
            let outcome = if args.action == LockAction::WaitSet {
                lock.wait_for_set(&args.name, interval, bound)
            } else {
                lock.wait_for_unset(&args.name, interval, bound)
            };
            pb.finish_and_clear();
            outcome?;
            println!("{} is {}", lock.lock_path(&args.name)?, wanted);
        }
    }
    Ok(())
}
