use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::path::PathBuf;
use vbatch_core::logging::LogLevel;
use vbatch_runner::cli::Commands as RunnerCommands;

#[derive(Parser)]
#[command(name = "vbatch")]
#[command(about = "Run CBMC proofs as dependent AWS Batch jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, help = "Print help for all commands recursively")]
    help_all: bool,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Path to a config.toml")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "AWS region. Overrides the config file.")]
    pub region: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Batch job queue, or 'default'. Overrides the config file."
    )]
    pub queue: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Runner(Box<RunnerCommands>),

    #[command(about = "Generate shell completions")]
    Completions(CompletionsArgs),
}

#[derive(Args)]
struct CompletionsArgs {
    #[arg(long, help = "Shell to generate completions for")]
    shell: Shell,
}

/// Every visible command with the words that invoke it, depth first.
fn visible_commands(cmd: &clap::Command, path: Vec<String>, out: &mut Vec<(String, clap::Command)>) {
    if cmd.is_hide_set() {
        return;
    }
    out.push((path.join(" "), cmd.clone()));
    for sub in cmd.get_subcommands() {
        let mut sub_path = path.clone();
        sub_path.push(sub.get_name().to_string());
        visible_commands(sub, sub_path, out);
    }
}

fn print_help_all() {
    let root = Cli::command();
    let mut commands = Vec::new();
    visible_commands(&root, vec![root.get_name().to_string()], &mut commands);

    println!("{}", "VBATCH - Complete Command Reference".bold());
    for (depth, (path, mut cmd)) in commands.into_iter().enumerate() {
        if depth > 0 {
            println!();
            println!("{}", format!("Command: {}", path).cyan().bold());
            println!("{}", "-".repeat(path.len() + 9));
        }
        print!("{}", cmd.render_help());
    }
}

fn init_logging(cmd: &RunnerCommands, config: Option<&std::path::Path>) {
    // Phase jobs log to the container's stderr, which the batch service keeps.
    if matches!(cmd, RunnerCommands::InternalPhase(_)) {
        vbatch_core::logging::init_stderr_logger();
        return;
    }

    let logging_config = vbatch_core::config::load_config(config)
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = vbatch_core::logging::init_session_logger(&logging_config) {
        eprintln!(
            "{}",
            format!("[ERROR] Failed to initialize session logger: {}", e).red()
        );
        vbatch_core::logging::init_stderr_logger();
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.help_all {
        print_help_all();
        return;
    }

    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("{}", format!("[ERROR] {}", e).red());
            std::process::exit(1);
        }
        return;
    };

    match command {
        Commands::Runner(cmd) => {
            vbatch_core::logging::set_log_level_from_env();
            if cli.verbose > 0 {
                vbatch_core::logging::set_log_level(LogLevel::from(cli.verbose.saturating_add(2)));
            }
            init_logging(&cmd, cli.config.as_deref());

            let runner_cli = vbatch_runner::cli::Cli {
                command: *cmd,
                verbose: cli.verbose,
                config: cli.config,
                region: cli.region,
                queue: cli.queue,
            };

            if let Err(e) = vbatch_runner::run(runner_cli) {
                tracing::error!("{}", e);
                eprintln!("{}", format!("[ERROR] {}", e).red());
                std::process::exit(1);
            }
        }
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(args.shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
}
