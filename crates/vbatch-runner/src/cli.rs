use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Runs CBMC proofs as AWS Batch jobs.",
    long_about = "This tool submits the build, property, coverage and report phases of a CBMC proof as dependent AWS Batch jobs, and watches, kills and coordinates them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        help = "Path to a config.toml (defaults to $XDG_CONFIG_HOME/vbatch/config.toml)"
    )]
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
pub enum Commands {
    #[command(about = "Submit the phase jobs of a proof run")]
    Submit(SubmitArgs),

    #[command(about = "Show the status of jobs, optionally until they finish")]
    Status(StatusArgs),

    #[command(about = "Terminate matching jobs")]
    Kill(KillArgs),

    #[command(about = "Set, clear, query or wait for a phase lock")]
    Lock(LockArgs),

    #[command(about = "Summarize a task log as a task tree")]
    Tree(TreeArgs),

    #[command(about = "Encode or decode tool flag strings")]
    Flags(FlagsArgs),

    #[command(hide = true)]
    InternalPhase(InternalPhaseArgs),
}

#[derive(Args)]
pub struct SubmitArgs {
    #[arg(long, value_name = "NAME", help = "Name of the run (default: <jobprefix>-<UTC timestamp>)")]
    pub jobname: Option<String>,

    #[arg(long, value_name = "STR", help = "Prefix of generated run names")]
    pub jobprefix: Option<String>,

    #[arg(long, value_name = "STR", help = "Task name used as commit status context (default: run name)")]
    pub taskname: Option<String>,

    #[arg(long, value_name = "DFN", help = "Job definition, nickname, or 'default'")]
    pub jobdef: Option<String>,

    #[arg(long, value_name = "OS")]
    pub jobos: Option<String>,

    #[arg(long, value_name = "CC")]
    pub jobcc: Option<String>,

    #[arg(long, value_name = "BKT")]
    pub bucket: Option<String>,

    #[arg(long, value_name = "BKT")]
    pub srcbucket: Option<String>,

    #[arg(long, value_name = "BKT")]
    pub wsbucket: Option<String>,

    #[arg(long, value_name = "BKT")]
    pub outbucket: Option<String>,

    #[arg(long, value_name = "GOTO")]
    pub goto: Option<String>,

    #[arg(long, value_name = "OPTS", allow_hyphen_values = true, help = "Checker flags, ';'-separated")]
    pub cbmcflags: Option<String>,

    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub cflags: Option<String>,

    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub ldflags: Option<String>,

    #[arg(long, overrides_with = "no_build")]
    pub build: bool,
    #[arg(long, overrides_with = "build", help = "Skip the build phase")]
    pub no_build: bool,

    #[arg(long, overrides_with = "no_property")]
    pub property: bool,
    #[arg(long, overrides_with = "property", help = "Skip the property phase")]
    pub no_property: bool,

    #[arg(long, overrides_with = "no_coverage")]
    pub coverage: bool,
    #[arg(long, overrides_with = "coverage", help = "Skip the coverage phase")]
    pub no_coverage: bool,

    #[arg(long, overrides_with = "no_report")]
    pub report: bool,
    #[arg(long, overrides_with = "report", help = "Skip the report phase")]
    pub no_report: bool,

    #[arg(long, value_name = "MB")]
    pub build_memory: Option<u32>,
    #[arg(long, value_name = "MB")]
    pub property_memory: Option<u32>,
    #[arg(long, value_name = "MB")]
    pub coverage_memory: Option<u32>,
    #[arg(long, value_name = "MB")]
    pub report_memory: Option<u32>,

    #[arg(long, value_name = "FILE", help = "Read run options from a JSON file")]
    pub json: Option<PathBuf>,

    #[arg(long, value_name = "STR", help = "Read run options from a JSON string")]
    pub jsons: Option<String>,

    #[arg(long, help = "Don't check that the job definition and queue exist")]
    pub skip_validation: bool,

    #[arg(long, value_name = "SHA", help = "Post a commit status for this commit")]
    pub sha: Option<String>,

    #[arg(long, value_name = "FILE", help = "Write the submitted job ids as JSON")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selector").required(true).multiple(true).args(["run", "jobname", "jobid"])))]
pub struct StatusArgs {
    #[arg(
        long,
        value_name = "NAME",
        conflicts_with_all = ["jobname", "jobid"],
        help = "Select the phase jobs of this run"
    )]
    pub run: Option<String>,

    #[arg(long, value_name = "REGEX", help = "Select jobs whose name matches")]
    pub jobname: Option<String>,

    #[arg(long, value_name = "REGEX", help = "Select jobs whose id matches")]
    pub jobid: Option<String>,

    #[arg(long, help = "Keep polling until every job has finished")]
    pub monitor: bool,

    #[arg(
        long,
        value_name = "SHA",
        requires_all = ["monitor", "run"],
        help = "Post the final commit status of the run for this commit"
    )]
    pub report: Option<String>,

    #[arg(long, value_name = "STR", help = "Commit status context (default: the run name)")]
    pub context: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selector").required(true).multiple(true).args(["run", "jobname", "jobid"])))]
pub struct KillArgs {
    #[arg(
        long,
        value_name = "NAME",
        conflicts_with_all = ["jobname", "jobid"],
        help = "Kill the phase jobs of this run"
    )]
    pub run: Option<String>,

    #[arg(long, value_name = "REGEX", help = "Kill jobs whose name matches")]
    pub jobname: Option<String>,

    #[arg(long, value_name = "REGEX", help = "Kill jobs whose id matches")]
    pub jobid: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LockAction {
    Set,
    Unset,
    IsSet,
    IsUnset,
    WaitSet,
    WaitUnset,
}

#[derive(Args)]
#[command(group(ArgGroup::new("location").required(true).args(["path", "jobname"])))]
pub struct LockArgs {
    #[arg(value_enum)]
    pub action: LockAction,

    #[arg(value_name = "LOCK", help = "One of build.txt, property.txt, coverage.txt, report.txt")]
    pub name: String,

    #[arg(long, value_name = "PATH", help = "Lock prefix as [s3://]bucket[/prefix]")]
    pub path: Option<String>,

    #[arg(long, value_name = "NAME", help = "Use the workspace prefix of this run")]
    pub jobname: Option<String>,

    #[arg(long, value_name = "SECS", help = "Seconds between checks while waiting")]
    pub interval: Option<u64>,

    #[arg(long, value_name = "BOUND", help = "Give up waiting after e.g. '1h30m'")]
    pub bound: Option<String>,
}

#[derive(Args)]
pub struct TreeArgs {
    #[arg(value_name = "LOG_FILE", help = "File of JSON task entries, one per line")]
    pub log: PathBuf,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub detail: u8,

    #[arg(long, help = "Summarize failed, incomplete and succeeded tasks instead")]
    pub failures: bool,
}

#[derive(Args)]
pub struct FlagsArgs {
    #[command(subcommand)]
    pub action: FlagsAction,
}

#[derive(Subcommand)]
pub enum FlagsAction {
    #[command(about = "Encode command-line words into a flag string")]
    Encode {
        #[arg(
            value_name = "WORDS",
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        words: Vec<String>,
    },
    #[command(about = "Show the flags held in a flag string")]
    Decode {
        #[arg(value_name = "STR", allow_hyphen_values = true)]
        value: String,

        #[arg(long, help = "Drop the flags the coverage phase can't use")]
        coverage: bool,
    },
}

#[derive(Args)]
pub struct InternalPhaseArgs {
    #[arg(long)]
    pub dobuild: bool,
    #[arg(long)]
    pub doproperty: bool,
    #[arg(long)]
    pub docoverage: bool,
    #[arg(long)]
    pub doreport: bool,

    #[arg(long, value_name = "NAME")]
    pub jobname: Option<String>,

    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    #[arg(long, value_name = "STR")]
    pub jsons: Option<String>,

    #[arg(long, value_name = "PHASE", help = "Wait for this phase's lock first")]
    pub wait_for: Option<String>,

    #[arg(long, value_name = "BOUND")]
    pub bound: Option<String>,

    #[arg(long, value_name = "FILE", help = "Append task entries to this JSON-lines file")]
    pub task_log: Option<PathBuf>,

    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub correlation_list: Vec<String>,

    #[arg(
        value_name = "COMMAND",
        num_args = 1..,
        last = true,
        help = "Run this instead of the phase's checker tools"
    )]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vbatch_core::config::{select_phase_command, OptionLayer, RunOptions};
    use vbatch_core::engine::plan_run;
    use vbatch_core::flags::ToolFlags;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("vbatch-runner").chain(args.iter().copied()))
    }

    #[test]
    fn test_submitted_phase_commands_parse() {
        let cli = OptionLayer {
            jobname: Some("run".into()),
            cbmcflags: Some(ToolFlags::decode("--unwind;1;--unwindset;loop.0:3").unwrap()),
            ..OptionLayer::default()
        };
        let opts = RunOptions::resolve(cli, OptionLayer::default(), Utc::now()).unwrap();
        let plans = plan_run(&opts).unwrap();
        assert_eq!(plans.len(), 4);

        for plan in plans {
            let words: Vec<&str> = plan.command.iter().map(String::as_str).collect();
            let parsed = parse(&words).unwrap_or_else(|e| panic!("{}: {}", plan.jobname, e));
            assert_eq!(parsed.region.as_deref(), Some("us-east-1"));
            match parsed.command {
                Commands::InternalPhase(args) => {
                    let phase = select_phase_command(
                        args.dobuild,
                        args.doproperty,
                        args.docoverage,
                        args.doreport,
                    )
                    .unwrap();
                    assert_eq!(phase, Some(plan.phase));
                    assert_eq!(args.jobname.as_deref(), Some(plan.jobname.as_str()));
                    assert!(args.command.is_empty());

                    let layer = OptionLayer::from_json_sources(None, args.jsons.as_deref()).unwrap();
                    let carried = RunOptions::resolve(layer, OptionLayer::default(), Utc::now()).unwrap();
                    assert_eq!(carried, opts);
                }
                _ => panic!("expected internal-phase for {}", plan.jobname),
            }
        }
    }

    #[test]
    fn test_internal_phase_command_is_optional() {
        let cli = parse(&["internal-phase", "--dobuild", "--jsons", "{}"]).unwrap();
        assert!(matches!(cli.command, Commands::InternalPhase(ref a) if a.command.is_empty()));

        let cli = parse(&["internal-phase", "--dobuild", "--", "make", "-j4"]).unwrap();
        match cli.command {
            Commands::InternalPhase(args) => assert_eq!(args.command, ["make", "-j4"]),
            _ => panic!("expected internal-phase"),
        }
    }

    #[test]
    fn test_status_needs_a_selector() {
        assert!(parse(&["status"]).is_err());
        assert!(parse(&["status", "--run", "cbmc-1"]).is_ok());
        assert!(parse(&["status", "--jobid", "abc", "--jobname", "x"]).is_ok());
        assert!(parse(&["status", "--run", "cbmc-1", "--jobid", "abc"]).is_err());
    }

    #[test]
    fn test_report_requires_monitor() {
        assert!(parse(&["status", "--run", "r", "--report", "abc123"]).is_err());
        assert!(parse(&["status", "--run", "r", "--monitor", "--report", "abc123"]).is_ok());
    }

    #[test]
    fn test_last_phase_toggle_wins() {
        let cli = parse(&["submit", "--no-build", "--build", "--no-report"]).unwrap();
        match cli.command {
            Commands::Submit(args) => {
                assert!(args.build && !args.no_build);
                assert!(args.no_report && !args.report);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["kill", "--run", "r", "--region", "eu-west-1", "-vv"]).unwrap();
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_lock_action_names() {
        let cli = parse(&["lock", "wait-unset", "build.txt", "--path", "cbmc/r/ws"]).unwrap();
        match cli.command {
            Commands::Lock(args) => assert_eq!(args.action, LockAction::WaitUnset),
            _ => panic!("expected lock"),
        }
    }
}
