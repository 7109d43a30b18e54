use crate::error::CliError;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use vbatch_client::Client;
use vbatch_core::config::Config;
use vbatch_core::model::CommitState;

pub mod flags;
pub mod internal;
pub mod kill;
pub mod lock;
pub mod status;
pub mod submit;
pub mod tree;

pub struct AppContext<'a> {
    pub config: &'a Config,
    pub region: &'a str,
    pub queue: &'a str,
    pub cli_region: Option<&'a str>,
    pub cli_queue: Option<&'a str>,
}

impl AppContext<'_> {
    pub fn client(&self) -> Result<Client, CliError> {
        Ok(Client::new(self.config.clone(), self.region)?)
    }
}

pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Posts a commit status; a failure here never fails the command.
pub(crate) fn report_status(client: &Client, sha: &str, ctx: &str, jobname: &str, state: CommitState) {
    match client.report(sha, ctx, jobname, state) {
        Ok(status) => tracing::debug!("Commit status for {}: {} ({})", sha, status.state, status.description),
        Err(e) => {
            tracing::warn!("Failed to post {} status for {}: {}", state, sha, e);
            eprintln!(
                "{}",
                format!("[WARN] Failed to post {} status for {}: {}", state, sha, e).yellow()
            );
        }
    }
}
