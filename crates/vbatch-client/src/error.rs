use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static CLI_ERROR_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"An error occurred \(([^)]+)\)")
        .unwrap_or_else(|e| panic!("invalid error code regex: {}", e))
});

/// A failed request to an external service, keeping the service's own error
/// code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} {operation} failed ({code}): {message}")]
pub struct BackendError {
    pub service: String,
    pub operation: String,
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Builds the error from the stderr of a failed `aws` invocation, which
    /// reads `An error occurred (<Code>) when calling the <Op> operation: ...`.
    pub fn from_cli_stderr(service: &str, operation: &str, stderr: &str) -> Self {
        let code = CLI_ERROR_CODE_RE
            .captures(stderr)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        Self::new(service, operation, code, stderr.trim())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code.as_str(),
            "404" | "NotFound" | "NoSuchKey" | "NoSuchBucket"
        )
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.code.as_str(), "403" | "Forbidden" | "AccessDenied")
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] vbatch_core::errors::ConfigError),

    #[error(transparent)]
    Domain(#[from] vbatch_core::errors::DomainError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Timed out waiting for lock '{lock}' at '{path}' after {attempts} checks.")]
    LockTimeout {
        lock: String,
        path: String,
        attempts: u64,
    },

    /// A later phase could not be submitted. `submitted` holds the phases
    /// already on the queue, which keep running.
    #[error(
        "Submitting {job_name} failed with [{}] already submitted: {source}",
        .submitted.submitted_ids().iter().map(|id| id.0.as_str()).collect::<Vec<_>>().join(", ")
    )]
    SubmissionAborted {
        job_name: String,
        submitted: Box<vbatch_core::model::RunResult>,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Bucket does not exist: {0}")]
    BucketNotFound(String),

    #[error("Failed to terminate jobs [{}]: {source}", .ids.join(", "))]
    TerminateFailed {
        ids: Vec<String>,
        #[source]
        source: BackendError,
    },

    #[error("Invalid job pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to run '{program}': {source}")]
    CommandLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected response from {operation}: {source}")]
    MalformedResponse {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        path: std::path::PathBuf,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
