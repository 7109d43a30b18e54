use crate::error::{BackendError, ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use vbatch_core::config::GithubConfig;
use vbatch_core::model::CommitState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl CommitStatus {
    pub fn for_run(github: &GithubConfig, ctx: &str, jobname: &str, state: CommitState) -> Self {
        let verdict = match state {
            CommitState::Pending => "Verification Pending",
            CommitState::Error => "Verification Error",
            CommitState::Failure => "Verification Failed",
            CommitState::Success => "Verification Succeeded",
        };
        Self {
            state,
            context: github.context(ctx),
            description: format!("{}: CBMC Batch job {}", verdict, jobname),
            target_url: match state {
                CommitState::Error => None,
                _ => github.target_url(jobname),
            },
        }
    }
}

/// Where commit statuses go.
pub trait StatusReporter: Send + Sync {
    fn post(&self, sha: &str, status: &CommitStatus) -> Result<()>;
}

/// Posts statuses with `gh api repos/<repo>/statuses/<sha>`.
#[derive(Debug, Clone)]
pub struct GhCliReporter {
    repo: String,
    program: PathBuf,
}

impl GhCliReporter {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            program: PathBuf::from("gh"),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, sha: &str, status: &CommitStatus) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("api")
            .arg(format!("repos/{}/statuses/{}", self.repo, sha))
            .arg("--method")
            .arg("POST")
            .arg("-f")
            .arg(format!("state={}", status.state))
            .arg("-f")
            .arg(format!("context={}", status.context))
            .arg("-f")
            .arg(format!("description={}", status.description));
        if let Some(url) = &status.target_url {
            cmd.arg("-f").arg(format!("target_url={}", url));
        }
        cmd
    }
}

impl StatusReporter for GhCliReporter {
    fn post(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        let mut cmd = self.command(sha, status);
        vbatch_core::logging::log_and_print_command(&cmd);

        let output = cmd.output().map_err(|source| ClientError::CommandLaunch {
            program: self.program.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::new(
                "github",
                "create-status",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr.trim(),
            )
            .into());
        }
        tracing::info!("Posted {} status for {} to {}", status.state, sha, self.repo);
        Ok(())
    }
}

/// Logs the status it would have posted.
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn post(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        let payload = serde_json::to_string(status).unwrap_or_default();
        tracing::info!("Not updating commit status for {}: {}", sha, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github() -> GithubConfig {
        GithubConfig {
            enabled: true,
            repo: Some("acme/widget".into()),
            context_prefix: None,
            target_url_base: Some("https://cdn.example.com".into()),
        }
    }

    #[test]
    fn test_pending_status_for_run() {
        let status = CommitStatus::for_run(&github(), "proofs", "cbmc-1", CommitState::Pending);
        assert_eq!(status.context, "CBMC Batch: proofs");
        assert_eq!(status.description, "Verification Pending: CBMC Batch job cbmc-1");
        assert_eq!(
            status.target_url.as_deref(),
            Some("https://cdn.example.com/cbmc-1/out/html/index.html")
        );
    }

    #[test]
    fn test_error_status_has_no_target_url() {
        let status = CommitStatus::for_run(&github(), "proofs", "cbmc-1", CommitState::Error);
        assert!(status.target_url.is_none());
    }

    #[test]
    fn test_gh_command_fields() {
        let reporter = GhCliReporter::new("acme/widget");
        let status = CommitStatus::for_run(&github(), "p", "run", CommitState::Success);
        let cmd = reporter.command("abc123", &status);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args[1], "repos/acme/widget/statuses/abc123");
        assert!(args.contains(&"state=success".to_string()));
        assert!(args.contains(&"context=CBMC Batch: p".to_string()));
        assert!(args.iter().any(|a| a.starts_with("target_url=")));
    }

    #[test]
    fn test_log_reporter_accepts_everything() {
        let status = CommitStatus::for_run(&github(), "p", "run", CommitState::Failure);
        assert!(LogReporter.post("sha", &status).is_ok());
    }
}
