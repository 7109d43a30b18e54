use crate::cli::{Cli, Commands};
use crate::commands::AppContext;
use crate::error::CliError;
use vbatch_core::config::{self, resolve, translate_job_queue};
use vbatch_core::constants::defaults;

pub mod cli;
pub mod commands;
pub mod error;

pub fn run(cli: Cli) -> Result<(), CliError> {
    let config = config::load_config(cli.config.as_deref())?;
    let region = resolve(
        cli.region.clone(),
        config.batch.region.clone(),
        defaults::REGION.to_string(),
    );
    let queue = translate_job_queue(cli.queue.as_deref().or(config.batch.jobqueue.as_deref()));
    tracing::debug!("Using region {} and queue {}", region, queue);

    let context = AppContext {
        config: &config,
        region: &region,
        queue: &queue,
        cli_region: cli.region.as_deref(),
        cli_queue: cli.queue.as_deref(),
    };

    match cli.command {
        Commands::Submit(args) => commands::submit::handle_submit(args, &context),
        Commands::Status(args) => commands::status::handle_status(args, &context),
        Commands::Kill(args) => commands::kill::handle_kill(args, &context),
        Commands::Lock(args) => commands::lock::handle_lock(args, &context),
        Commands::Tree(args) => commands::tree::handle_tree(args),
        Commands::Flags(args) => commands::flags::handle_flags(args),
        Commands::InternalPhase(args) => commands::internal::handle_internal_phase(args, &context),
    }
}
