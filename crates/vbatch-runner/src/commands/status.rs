use crate::{cli::StatusArgs, commands::AppContext, error::CliError};
use chrono::Local;
use colored::Colorize;
use vbatch_client::status::{render_status_table, JobFilter};
use vbatch_core::{engine::determine_commit_state, errors::ConfigError, model::JobRecord};

fn print_records(records: &[JobRecord]) {
    for record in records {
        println!("{}: {}", record.name, record.status);
    }
}

pub fn handle_status(args: StatusArgs, context: &AppContext<'_>) -> Result<(), CliError> {
    let filter = match &args.run {
        Some(run) => JobFilter::for_run(run)?,
        None => JobFilter::new(args.jobid.as_deref(), args.jobname.as_deref())?,
    };
    let client = context.client()?;

    if !args.monitor {
        let records = client.poll(context.queue, &filter)?;
        if records.is_empty() {
            println!("No matching jobs on queue '{}'.", context.queue);
        }
        print_records(&records);
        return Ok(());
    }

    ctrlc::set_handler(|| {
        tracing::warn!("Monitor interrupted by user");
        eprintln!("\n{}", "Interrupted; jobs keep running.".yellow());
        std::process::exit(130);
    })
    .map_err(|e| ConfigError::General(format!("Can't install Ctrl-C handler: {}", e)))?;

    let pb = super::spinner(format!("Watching jobs on '{}'...", context.queue));
    let records = client.monitor(context.queue, &filter, |changes, all| {
        pb.suspend(|| {
            if let Some(first) = changes.first() {
                let seen = first.at.with_timezone(&Local);
                println!("{}", seen.format("%Y-%m-%d %H:%M:%S").to_string().bold());
            }
            for change in changes {
                tracing::debug!("{} is now {} (seen {})", change.name, change.current, change.at);
            }
            println!("{}", render_status_table(all));
        });
        let running = all.iter().filter(|r| !r.status.is_terminal()).count();
        pb.set_message(format!("{} of {} jobs still running...", running, all.len()));
    })?;
    pb.finish_and_clear();

    if records.is_empty() {
        println!(
            "{}",
            format!("[WARN] No jobs matched on queue '{}'; nothing to monitor.", context.queue)
                .yellow()
        );
    }

    let state = determine_commit_state(true, &records);
    if let (Some(sha), Some(run)) = (&args.report, &args.run) {
        let ctx = args.context.as_deref().unwrap_or(run);
        super::report_status(&client, sha, ctx, run, state);
    }

    println!("All jobs finished: {}", state);
    Ok(())
}
