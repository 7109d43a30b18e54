use crate::{cli::SubmitArgs, commands::AppContext, error::CliError};
use chrono::Utc;
use colored::Colorize;
use vbatch_client::error::ClientError;
use vbatch_core::{
    config::{OptionLayer, RunOptions},
    flags::ToolFlags,
    model::{CommitState, Phase, RunResult},
};

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (_, true) => Some(false),
        (true, false) => Some(true),
        (false, false) => None,
    }
}

fn decode_flags(raw: Option<&str>) -> Result<Option<ToolFlags>, CliError> {
    Ok(raw.map(ToolFlags::decode).transpose()?)
}

impl SubmitArgs {
    /// The command-line layer of the run options.
    pub fn option_layer(&self, context: &AppContext<'_>) -> Result<OptionLayer, CliError> {
        Ok(OptionLayer {
            jobname: self.jobname.clone(),
            jobprefix: self.jobprefix.clone(),
            taskname: self.taskname.clone(),
            region: context.cli_region.map(str::to_string),
            jobqueue: context.cli_queue.map(str::to_string),
            jobdef: self.jobdef.clone(),
            jobos: self.jobos.clone(),
            jobcc: self.jobcc.clone(),
            bucket: self.bucket.clone(),
            srcbucket: self.srcbucket.clone(),
            wsbucket: self.wsbucket.clone(),
            outbucket: self.outbucket.clone(),
            goto: self.goto.clone(),
            cbmcflags: decode_flags(self.cbmcflags.as_deref())?,
            cflags: decode_flags(self.cflags.as_deref())?,
            ldflags: decode_flags(self.ldflags.as_deref())?,
            build: toggle(self.build, self.no_build),
            property: toggle(self.property, self.no_property),
            coverage: toggle(self.coverage, self.no_coverage),
            report: toggle(self.report, self.no_report),
            build_memory: self.build_memory,
            property_memory: self.property_memory,
            coverage_memory: self.coverage_memory,
            report_memory: self.report_memory,
        })
    }
}

/// Resolves run options: command line, then `--json`/`--jsons`, then the
/// config file, then built-in defaults.
pub fn resolve_options(args: &SubmitArgs, context: &AppContext<'_>) -> Result<RunOptions, CliError> {
    let json_layer = OptionLayer::from_json_sources(args.json.as_deref(), args.jsons.as_deref())?;
    let file_layer = json_layer.over(OptionLayer::from_config(context.config));
    let cli_layer = args.option_layer(context)?;
    Ok(RunOptions::resolve(cli_layer, file_layer, Utc::now())?)
}

fn print_result(result: &RunResult) {
    for phase in Phase::ALL {
        let slot = result.phase(phase);
        match (&slot.jobid, &slot.jobname) {
            (Some(id), Some(name)) => {
                println!("  {} {} as {}", "OK".green().bold(), name, id.to_string().dimmed())
            }
            _ => println!("  {} {} (not scheduled)", "--".dimmed(), phase),
        }
    }
}

pub fn handle_submit(args: SubmitArgs, context: &AppContext<'_>) -> Result<(), CliError> {
    let opts = resolve_options(&args, context)?;
    let client = context.client()?;

    println!(
        "- Submitting run '{}' to queue '{}' with definition '{}'...",
        opts.jobname.cyan(),
        opts.jobqueue.cyan(),
        opts.jobdef.cyan()
    );

    let result = match client.submit(&opts, !args.skip_validation) {
        Ok(result) => result,
        Err(e) => {
            if let ClientError::SubmissionAborted { submitted, .. } = &e {
                println!("{}", "- Jobs already submitted keep running:".yellow());
                print_result(submitted);
            }
            if let Some(sha) = &args.sha {
                super::report_status(&client, sha, &opts.taskname, &opts.jobname, CommitState::Error);
            }
            return Err(e.into());
        }
    };

    print_result(&result);
    if let Some(sha) = &args.sha {
        super::report_status(&client, sha, &opts.taskname, &opts.jobname, CommitState::Pending);
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("- Wrote job ids to {}", path.display());
        }
        None => tracing::info!("Submitted run {}", json),
    }

    println!(
        "Run '{}' submitted with {} jobs.",
        opts.jobname,
        result.submitted_ids().len().to_string().bold()
    );
    Ok(())
}
