//! Process-wide logging. Interactive commands write one log file per session
//! under `$XDG_CACHE_HOME/vbatch/logs`; phase jobs log to stderr, which the
//! batch service captures.

use crate::config::LoggingConfig;
use crate::constants::env as env_vars;
use crate::errors::ConfigError;
use chrono::{DateTime, Local, NaiveDateTime};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const SESSION_PREFIX: &str = "vbatch_";
const SESSION_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `-v` counts map onto levels starting at `Error`; anything past `Trace`
/// saturates.
impl From<u8> for LogLevel {
    fn from(val: u8) -> Self {
        match val {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigError::General(format!("Unknown log level '{}'", other))),
        }
    }
}

static LOG_LEVEL: Mutex<LogLevel> = Mutex::new(LogLevel::Info);

/// Sets the level used when `RUST_LOG` is absent. Must run before the
/// logger is initialized.
pub fn set_log_level(level: LogLevel) {
    if let Ok(mut current) = LOG_LEVEL.lock() {
        *current = level;
    }
}

/// Applies `VBATCH_LOG_LEVEL` if it names a known level.
pub fn set_log_level_from_env() {
    let Ok(raw) = env::var(env_vars::LOG_LEVEL) else {
        return;
    };
    match raw.parse::<LogLevel>() {
        Ok(level) => set_log_level(level),
        Err(e) => eprintln!("Ignoring {}: {}", env_vars::LOG_LEVEL, e),
    }
}

fn current_level() -> LogLevel {
    LOG_LEVEL.lock().map(|level| *level).unwrap_or(LogLevel::Info)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(current_level().directive()))
}

struct Timestamp;

impl FormatTime for Timestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// One session log file, named after the moment and process that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    pub dir: PathBuf,
    pub file_name: String,
}

impl SessionLog {
    pub fn new(dir: &Path, opened: DateTime<Local>, pid: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            file_name: format!("{}{}_{}.log", SESSION_PREFIX, opened.format(SESSION_STAMP), pid),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// When a session log was opened, read back from its file name.
fn opened_at(file_name: &str) -> Option<DateTime<Local>> {
    let rest = file_name
        .strip_prefix(SESSION_PREFIX)?
        .strip_suffix(".log")?;
    let (stamp, _pid) = rest.rsplit_once('_')?;
    NaiveDateTime::parse_from_str(stamp, SESSION_STAMP)
        .ok()?
        .and_local_timezone(Local)
        .earliest()
}

/// Deletes session logs beyond `max_files` (oldest first) and those older
/// than `max_age_days`. A zero limit disables that rule. Other files in the
/// directory are left alone.
pub fn prune_session_logs(
    dir: &Path,
    config: &LoggingConfig,
    now: DateTime<Local>,
) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut sessions: Vec<(DateTime<Local>, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            opened_at(&name).map(|opened| (opened, entry.path()))
        })
        .collect();
    sessions.sort();

    let mut doomed = Vec::new();
    if config.max_files > 0 && sessions.len() > config.max_files {
        let excess = sessions.len() - config.max_files;
        doomed.extend(sessions.drain(..excess).map(|(_, path)| path));
    }
    if config.max_age_days > 0 {
        let max_age = Duration::from_secs(config.max_age_days.saturating_mul(86_400));
        doomed.extend(
            sessions
                .into_iter()
                .filter(|(opened, _)| {
                    now.signed_duration_since(*opened)
                        .to_std()
                        .is_ok_and(|age| age > max_age)
                })
                .map(|(_, path)| path),
        );
    }

    for path in &doomed {
        if let Err(e) = fs::remove_file(path) {
            eprintln!("Can't remove old log {}: {}", path.display(), e);
        }
    }
    Ok(doomed)
}

/// Opens a fresh session log and routes all tracing output to it. The
/// `vbatch.log` link in the cache directory points at the newest session.
pub fn init_session_logger(config: &LoggingConfig) -> Result<(), ConfigError> {
    let cache_home = xdg::BaseDirectories::with_prefix("vbatch")
        .get_cache_home()
        .ok_or_else(|| ConfigError::General("Could not find cache home directory".to_string()))?;
    let logs_dir = cache_home.join("logs");
    fs::create_dir_all(&logs_dir)?;

    let now = Local::now();
    prune_session_logs(&logs_dir, config, now)?;
    let session = SessionLog::new(&logs_dir, now, std::process::id());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(session.path())?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_timer(Timestamp)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    // Integration tests read the log on stderr as well.
    let tee_layer = env::var_os(env_vars::TEST_LOG_TEE).map(|_| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(Timestamp)
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(file_layer.with_filter(env_filter()))
        .with(tee_layer.map(|layer| layer.with_filter(env_filter())))
        .try_init()
        .map_err(|e| ConfigError::General(format!("Logger already initialized: {}", e)))?;

    let link = cache_home.join("vbatch.log");
    let _ = fs::remove_file(&link);
    #[cfg(unix)]
    {
        let _ = std::os::unix::fs::symlink(Path::new("logs").join(&session.file_name), &link);
    }

    tracing::info!("Session log {}", session.path().display());
    Ok(())
}

pub fn init_stderr_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_timer(Timestamp)
        .with_target(false)
        .try_init();
}

fn shell_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// A command as a shell line, quoting words the shell would split or
/// interpret.
pub fn command_display(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|word| shell_word(&word.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn log_and_print_command(command: &Command) {
    tracing::debug!("[CMD] {}", command_display(command));
}
