use crate::constants::{defaults, job_definitions, store};
use crate::errors::ConfigError;
use crate::flags::ToolFlags;
use crate::model::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// First defined value wins: command line, then file, then the default.
pub fn resolve<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub max_files: usize,
    pub max_age_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    pub build: Option<u32>,
    pub property: Option<u32>,
    pub coverage: Option<u32>,
    pub report: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub region: Option<String>,
    pub jobqueue: Option<String>,
    pub jobdef: Option<String>,
    pub jobos: Option<String>,
    pub jobcc: Option<String>,
    pub jobprefix: Option<String>,
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhasesConfig {
    pub build: Option<bool>,
    pub property: Option<bool>,
    pub coverage: Option<bool>,
    pub report: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    S3,
    Fs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub bucket: Option<String>,
    /// Directory holding one sub-directory per bucket when `kind = "fs"`.
    pub root: Option<PathBuf>,
}

impl StoreConfig {
    pub fn expanded_root(&self) -> Result<Option<PathBuf>, ConfigError> {
        self.root.as_deref().map(expand_path).transpose()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub lock_interval_secs: Option<u64>,
    pub monitor_interval_secs: Option<u64>,
}

impl PollConfig {
    pub fn lock_interval(&self) -> u64 {
        self.lock_interval_secs
            .unwrap_or(defaults::LOCK_POLL_INTERVAL_SECS)
    }

    pub fn monitor_interval(&self) -> u64 {
        self.monitor_interval_secs
            .unwrap_or(defaults::MONITOR_POLL_INTERVAL_SECS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    pub enabled: bool,
    /// `owner/name` of the repository receiving commit statuses.
    pub repo: Option<String>,
    pub context_prefix: Option<String>,
    /// Base URL (e.g. a CDN host) in front of the output bucket.
    pub target_url_base: Option<String>,
}

impl GithubConfig {
    pub fn context(&self, ctx: &str) -> String {
        format!(
            "{}{}",
            self.context_prefix
                .as_deref()
                .unwrap_or(defaults::STATUS_CONTEXT_PREFIX),
            ctx
        )
    }

    pub fn target_url(&self, jobname: &str) -> Option<String> {
        self.target_url_base.as_ref().map(|base| {
            format!(
                "{}/{}/out/html/index.html",
                base.trim_end_matches('/'),
                jobname
            )
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub batch: BatchConfig,
    pub phases: PhasesConfig,
    pub store: StoreConfig,
    pub poll: PollConfig,
    pub github: GithubConfig,
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vbatch");
    let config_home = xdg_dirs.get_config_home().ok_or_else(|| {
        ConfigError::General("Could not determine the config home directory".to_string())
    })?;
    Ok(config_home.join("config.toml"))
}

/// Loads the TOML configuration. An explicit path must exist; the default
/// location is optional and falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (expand_path(p)?, true),
        None => (default_config_path()?, false),
    };

    if !path.exists() {
        if required {
            return Err(ConfigError::PathIo {
                path,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            });
        }
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    tracing::debug!("Loading config from {}", path.display());
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::PathIo {
        path: path.clone(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

fn expand_path(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| ConfigError::General(format!("Can't expand path '{}': {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// One layer of run options. The command line and the `--json`/`--jsons`
/// options each produce one; the TOML config contributes another through
/// [`OptionLayer::from_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLayer {
    pub jobname: Option<String>,
    pub jobprefix: Option<String>,
    pub taskname: Option<String>,
    pub region: Option<String>,
    pub jobqueue: Option<String>,
    pub jobdef: Option<String>,
    pub jobos: Option<String>,
    pub jobcc: Option<String>,
    pub bucket: Option<String>,
    pub srcbucket: Option<String>,
    pub wsbucket: Option<String>,
    pub outbucket: Option<String>,
    pub goto: Option<String>,
    pub cbmcflags: Option<ToolFlags>,
    pub cflags: Option<ToolFlags>,
    pub ldflags: Option<ToolFlags>,
    pub build: Option<bool>,
    pub property: Option<bool>,
    pub coverage: Option<bool>,
    pub report: Option<bool>,
    pub build_memory: Option<u32>,
    pub property_memory: Option<u32>,
    pub coverage_memory: Option<u32>,
    pub report_memory: Option<u32>,
}

impl OptionLayer {
    pub fn from_config(config: &Config) -> Self {
        let batch = &config.batch;
        Self {
            jobprefix: batch.jobprefix.clone(),
            region: batch.region.clone(),
            jobqueue: batch.jobqueue.clone(),
            jobdef: batch.jobdef.clone(),
            jobos: batch.jobos.clone(),
            jobcc: batch.jobcc.clone(),
            bucket: config.store.bucket.clone(),
            build: config.phases.build,
            property: config.phases.property,
            coverage: config.phases.coverage,
            report: config.phases.report,
            build_memory: batch.memory.build,
            property_memory: batch.memory.property,
            coverage_memory: batch.memory.coverage,
            report_memory: batch.memory.report,
            ..Self::default()
        }
    }

    /// Reads the JSON layer from a file or an inline string; giving both is
    /// an error.
    pub fn from_json_sources(
        file: Option<&Path>,
        inline: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match (file, inline) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingOptionSources),
            (Some(path), None) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::PathIo {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(serde_json::from_str(&content)?)
            }
            (None, Some(json)) => Ok(serde_json::from_str(json)?),
            (None, None) => Ok(Self::default()),
        }
    }

    /// Fills every field still unset in `self` from `lower`.
    pub fn over(self, lower: OptionLayer) -> OptionLayer {
        OptionLayer {
            jobname: self.jobname.or(lower.jobname),
            jobprefix: self.jobprefix.or(lower.jobprefix),
            taskname: self.taskname.or(lower.taskname),
            region: self.region.or(lower.region),
            jobqueue: self.jobqueue.or(lower.jobqueue),
            jobdef: self.jobdef.or(lower.jobdef),
            jobos: self.jobos.or(lower.jobos),
            jobcc: self.jobcc.or(lower.jobcc),
            bucket: self.bucket.or(lower.bucket),
            srcbucket: self.srcbucket.or(lower.srcbucket),
            wsbucket: self.wsbucket.or(lower.wsbucket),
            outbucket: self.outbucket.or(lower.outbucket),
            goto: self.goto.or(lower.goto),
            cbmcflags: self.cbmcflags.or(lower.cbmcflags),
            cflags: self.cflags.or(lower.cflags),
            ldflags: self.ldflags.or(lower.ldflags),
            build: self.build.or(lower.build),
            property: self.property.or(lower.property),
            coverage: self.coverage.or(lower.coverage),
            report: self.report.or(lower.report),
            build_memory: self.build_memory.or(lower.build_memory),
            property_memory: self.property_memory.or(lower.property_memory),
            coverage_memory: self.coverage_memory.or(lower.coverage_memory),
            report_memory: self.report_memory.or(lower.report_memory),
        }
    }
}

/// Fully resolved options of one run. This is also the JSON document handed
/// to every phase job through `--jsons`, so its field names match
/// [`OptionLayer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub jobname: String,
    pub jobprefix: String,
    pub taskname: String,
    pub region: String,
    pub jobqueue: String,
    pub jobdef: String,
    pub jobos: String,
    pub jobcc: String,
    pub bucket: String,
    pub srcbucket: String,
    pub wsbucket: String,
    pub outbucket: String,
    pub goto: String,
    pub cbmcflags: Option<ToolFlags>,
    pub cflags: Option<ToolFlags>,
    pub ldflags: Option<ToolFlags>,
    pub build: bool,
    pub property: bool,
    pub coverage: bool,
    pub report: bool,
    pub build_memory: u32,
    pub property_memory: u32,
    pub coverage_memory: u32,
    pub report_memory: u32,
}

impl RunOptions {
    pub fn resolve(
        cli: OptionLayer,
        file: OptionLayer,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let jobprefix = resolve(cli.jobprefix, file.jobprefix, defaults::JOB_PREFIX.to_string());
        let jobname = resolve(cli.jobname, file.jobname, default_job_name(&jobprefix, now));
        if jobname.trim().is_empty() {
            return Err(ConfigError::General("Job name must not be empty".to_string()));
        }
        let taskname = resolve(cli.taskname, file.taskname, jobname.clone());

        let jobos = resolve(cli.jobos, file.jobos, defaults::JOB_OS.to_string());
        let jobcc = resolve(cli.jobcc, file.jobcc, defaults::JOB_CC.to_string());
        let jobdef = translate_job_definition(cli.jobdef.or(file.jobdef).as_deref(), &jobos, &jobcc);
        let jobqueue = translate_job_queue(cli.jobqueue.or(file.jobqueue).as_deref());

        let bucket = resolve(cli.bucket, file.bucket, defaults::BUCKET.to_string());
        let run_prefix = format!("{}/{}", bucket.trim_end_matches('/'), jobname);
        let srcbucket = resolve(cli.srcbucket, file.srcbucket, format!("{}/{}", run_prefix, store::SRC));
        let wsbucket = resolve(cli.wsbucket, file.wsbucket, format!("{}/{}", run_prefix, store::WS));
        let outbucket = resolve(cli.outbucket, file.outbucket, format!("{}/{}", run_prefix, store::OUT));

        Ok(Self {
            region: resolve(cli.region, file.region, defaults::REGION.to_string()),
            goto: resolve(cli.goto, file.goto, defaults::GOTO.to_string()),
            cbmcflags: cli.cbmcflags.or(file.cbmcflags),
            cflags: cli.cflags.or(file.cflags),
            ldflags: cli.ldflags.or(file.ldflags),
            build: resolve(cli.build, file.build, true),
            property: resolve(cli.property, file.property, true),
            coverage: resolve(cli.coverage, file.coverage, true),
            report: resolve(cli.report, file.report, true),
            build_memory: resolve(cli.build_memory, file.build_memory, defaults::BUILD_MEMORY),
            property_memory: resolve(
                cli.property_memory,
                file.property_memory,
                defaults::PROPERTY_MEMORY,
            ),
            coverage_memory: resolve(
                cli.coverage_memory,
                file.coverage_memory,
                defaults::COVERAGE_MEMORY,
            ),
            report_memory: resolve(cli.report_memory, file.report_memory, defaults::REPORT_MEMORY),
            jobname,
            jobprefix,
            taskname,
            jobqueue,
            jobdef,
            jobos,
            jobcc,
            bucket,
            srcbucket,
            wsbucket,
            outbucket,
        })
    }

    pub fn enabled(&self, phase: Phase) -> bool {
        match phase {
            Phase::Build => self.build,
            Phase::Property => self.property,
            Phase::Coverage => self.coverage,
            Phase::Report => self.report,
        }
    }

    pub fn memory(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Build => self.build_memory,
            Phase::Property => self.property_memory,
            Phase::Coverage => self.coverage_memory,
            Phase::Report => self.report_memory,
        }
    }

    /// Flags the checker receives in `phase`.
    pub fn checker_flags(&self, phase: Phase) -> Option<ToolFlags> {
        let flags = self.cbmcflags.as_ref()?;
        Some(match phase {
            Phase::Coverage => flags.for_coverage(),
            _ => flags.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn default_job_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d-%H%M%S"))
}

/// Maps a job definition nickname to the registered definition name.
/// Unknown names pass through untouched.
pub fn translate_job_definition(jobdef: Option<&str>, jobos: &str, jobcc: &str) -> String {
    let name = match jobdef {
        None | Some("default") => format!("{}-{}", jobos, jobcc),
        Some(other) => other.to_string(),
    };
    match name.as_str() {
        "ubuntu14" | "ubuntu14-gcc" => job_definitions::UBUNTU14_GCC.to_string(),
        "ubuntu16" | "ubuntu16-gcc" => job_definitions::UBUNTU16_GCC.to_string(),
        _ => name,
    }
}

pub fn translate_job_queue(jobqueue: Option<&str>) -> String {
    match jobqueue {
        None | Some("default") => defaults::JOB_QUEUE.to_string(),
        Some(other) => other.to_string(),
    }
}

/// The single phase a job container was asked to run, from the
/// `--dobuild`/`--doproperty`/`--docoverage`/`--doreport` switches.
pub fn select_phase_command(
    dobuild: bool,
    doproperty: bool,
    docoverage: bool,
    doreport: bool,
) -> Result<Option<Phase>, ConfigError> {
    let chosen: Vec<Phase> = Phase::ALL
        .into_iter()
        .zip([dobuild, doproperty, docoverage, doreport])
        .filter_map(|(phase, set)| set.then_some(phase))
        .collect();

    match chosen.as_slice() {
        [] => Ok(None),
        [phase] => Ok(Some(*phase)),
        many => Err(ConfigError::ConflictingPhaseCommands(
            many.iter().map(|p| p.command_flag().to_string()).collect(),
        )),
    }
}
