use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use vbatch_core::constants::store::S3_SCHEME;
use vbatch_core::errors::ConfigError;

pub mod fs;
pub mod s3;

pub use fs::FsStore;
pub use s3::AwsCliS3;

/// Blocking pause between polls. Tests pass a no-op.
pub type Sleeper = fn(Duration);

static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:s3://)?([a-z0-9][a-z0-9_-]*)(?:/([a-z0-9][a-z0-9_.-]*(?:/[a-z0-9][a-z0-9_.-]*)*))?/?$",
    )
    .unwrap_or_else(|e| panic!("invalid store path regex: {}", e))
});

/// A bucket, or an object inside one, written `[s3://]bucket[/key]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    pub bucket: String,
    pub key: Option<String>,
}

impl ObjectPath {
    pub fn parse(path: &str) -> std::result::Result<Self, ConfigError> {
        let trimmed = path.trim();
        let caps = PATH_RE
            .captures(trimmed)
            .ok_or_else(|| ConfigError::InvalidStorePath(path.to_string()))?;
        let bucket = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ConfigError::InvalidStorePath(path.to_string()))?;
        Ok(Self {
            bucket,
            key: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }

    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: None,
        }
    }

    pub fn is_bucket(&self) -> bool {
        self.key.is_none()
    }

    /// The object `name` directly under this path.
    pub fn join(&self, name: &str) -> Self {
        let key = match &self.key {
            Some(prefix) => format!("{}/{}", prefix, name),
            None => name.to_string(),
        };
        Self {
            bucket: self.bucket.clone(),
            key: Some(key),
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", S3_SCHEME, self)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}/{}", self.bucket, key),
            None => write!(f, "{}", self.bucket),
        }
    }
}

/// Key-presence storage. Every method is a single round trip.
pub trait ObjectStore: Send + Sync {
    fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    fn exists(&self, path: &ObjectPath) -> Result<bool>;

    /// Creates (or overwrites) a zero-byte object.
    fn put(&self, path: &ObjectPath) -> Result<()>;

    /// Deletes an object; deleting a missing object succeeds.
    fn delete(&self, path: &ObjectPath) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Exists,
    Absent,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exists => write!(f, "exists"),
            Condition::Absent => write!(f, "absent"),
        }
    }
}

/// Checks `path` up to `attempts` times, sleeping `interval` between checks.
/// Returns whether the condition was observed before the attempts ran out.
pub fn wait_for_condition(
    store: &dyn ObjectStore,
    path: &ObjectPath,
    condition: Condition,
    interval: Duration,
    attempts: u64,
    sleep: Sleeper,
) -> Result<bool> {
    for attempt in 1..=attempts {
        let present = store.exists(path)?;
        let satisfied = match condition {
            Condition::Exists => present,
            Condition::Absent => !present,
        };
        if satisfied {
            tracing::debug!("{} {} after {} checks", path, condition, attempt);
            return Ok(true);
        }
        if attempt < attempts {
            sleep(interval);
        }
    }
    tracing::debug!("{} not {} after {} checks", path, condition, attempts);
    Ok(false)
}
