use clap::Parser;
use colored::Colorize;
use vbatch_core::logging::LogLevel;
use vbatch_runner::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    vbatch_core::logging::set_log_level_from_env();
    if cli.verbose > 0 {
        vbatch_core::logging::set_log_level(LogLevel::from(cli.verbose.saturating_add(2)));
    }

    if matches!(cli.command, Commands::InternalPhase(_)) {
        vbatch_core::logging::init_stderr_logger();
    } else {
        let logging_config = vbatch_core::config::load_config(cli.config.as_deref())
            .map(|c| c.logging)
            .unwrap_or_default();
        if let Err(e) = vbatch_core::logging::init_session_logger(&logging_config) {
            vbatch_core::logging::init_stderr_logger();
            tracing::warn!("Failed to initialize session logger: {}", e);
        }
    }

    if let Err(e) = vbatch_runner::run(cli) {
        tracing::error!("{}", e);
        eprintln!("{}", format!("[ERROR] {}", e).red());
        std::process::exit(1);
    }
}
