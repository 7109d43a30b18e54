use crate::error::{BackendError, ClientError, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::Command;

/// Runs `aws <service> <operation> ...` for one region and hands back its
/// stdout.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: PathBuf,
    region: String,
}

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("aws"),
            region: region.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn command(&self, service: &str, operation: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(service)
            .arg(operation)
            .args(args)
            .arg("--region")
            .arg(&self.region)
            .arg("--output")
            .arg("json");
        cmd
    }

    pub fn run(&self, service: &str, operation: &str, args: &[String]) -> Result<String> {
        let mut cmd = self.command(service, operation, args);
        vbatch_core::logging::log_and_print_command(&cmd);

        let output = cmd.output().map_err(|source| ClientError::CommandLaunch {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("{} {} failed: {}", service, operation, stderr.trim());
            return Err(BackendError::from_cli_stderr(service, operation, &stderr).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn run_json<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<T> {
        let stdout = self.run(service, operation, args)?;
        serde_json::from_str(&stdout).map_err(|source| ClientError::MalformedResponse {
            operation: format!("{} {}", service, operation),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_carries_region_and_json_output() {
        let cli = AwsCli::new("eu-west-1");
        let cmd = cli.command("batch", "list-jobs", &["--job-queue".into(), "Q".into()]);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "batch",
                "list-jobs",
                "--job-queue",
                "Q",
                "--region",
                "eu-west-1",
                "--output",
                "json"
            ]
        );
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let cli = AwsCli::new("us-east-1").with_program("/nonexistent/vbatch-aws");
        let err = cli.run("s3api", "head-bucket", &[]).unwrap_err();
        assert!(matches!(err, ClientError::CommandLaunch { .. }));
    }
}
