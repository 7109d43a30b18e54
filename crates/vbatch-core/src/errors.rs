use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path '{path}': {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON options: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("XDG Base Directory Error: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),

    #[error("Invalid configuration: {0}")]
    General(String),

    #[error("Can't parse time bound: '{0}'. Expected the form [Nd][Nh][Nm][Ns], e.g. '1h30m'.")]
    InvalidDuration(String),

    #[error("Not a valid bucket or object path: '{0}'")]
    InvalidStorePath(String),

    #[error("Too many phase commands given: {}. At most one of --dobuild, --doproperty, --docoverage, --doreport may be set.", .0.join(", "))]
    ConflictingPhaseCommands(Vec<String>),

    #[error("Can't give both a JSON file and a JSON string of options.")]
    ConflictingOptionSources,

    #[error("Malformed tool flags '{input}': {reason}")]
    InvalidFlags { input: String, reason: String },

    #[error("Poll interval must be greater than zero seconds.")]
    ZeroPollInterval,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown lock: '{0}'. Valid locks are: build.txt, property.txt, coverage.txt, report.txt")]
    InvalidLockName(String),

    #[error("Unknown phase: '{0}'. Valid phases are: build, property, coverage, report")]
    UnknownPhase(String),

    #[error("Unknown job status: '{0}'")]
    UnknownStatus(String),

    #[error("Job definitions from Batch contained multiple active definitions of '{0}'")]
    DuplicateDefinition(String),

    #[error("Job queues from Batch contained multiple definitions of '{0}'")]
    AmbiguousQueue(String),

    #[error("No active job definition found named '{0}'")]
    DefinitionNotFound(String),

    #[error("No job queue found named '{0}'")]
    QueueNotFound(String),

    #[error("Task log contains no entries to build a task tree from.")]
    EmptyTaskLog,

    #[error("Task log has {} root correlation ids, expected exactly one: {}", .0.len(), .0.join(", "))]
    MultipleTaskRoots(Vec<String>),

    #[error("Task entry '{0}' has an empty correlation list.")]
    EmptyCorrelationList(String),
}
