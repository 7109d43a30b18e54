use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] vbatch_core::errors::ConfigError),

    #[error(transparent)]
    Domain(#[from] vbatch_core::errors::DomainError),

    #[error(transparent)]
    Client(#[from] vbatch_client::error::ClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Phase '{phase}' failed: {message}")]
    PhaseFailed { phase: String, message: String },
}
