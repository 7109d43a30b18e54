use crate::{cli::KillArgs, commands::AppContext, error::CliError};
use colored::Colorize;
use vbatch_client::status::JobFilter;

pub fn handle_kill(args: KillArgs, context: &AppContext<'_>) -> Result<(), CliError> {
    let filter = match &args.run {
        Some(run) => JobFilter::for_run(run)?,
        None => JobFilter::new(args.jobid.as_deref(), args.jobname.as_deref())?,
    };
    let client = context.client()?;

    let killed = client.kill(context.queue, &filter)?;
    if killed.is_empty() {
        println!("No matching jobs on queue '{}'.", context.queue);
        return Ok(());
    }
    for id in &killed {
        println!("  {} {}", "KILLED".red().bold(), id);
    }
    println!("Terminated {} jobs.", killed.len());
    Ok(())
}
