//! Error handling for the `ctlink` CLI.

use thiserror::Error;

/// Top-level error type for the `ctlink` binary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file operation failed: {0}")]
    FileOperation(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("link engine error: {0}")]
    Link(#[from] ctfc_model::LinkError),

    #[error("archive error: {0}")]
    Archive(#[from] ctfc_archive::ArchiveError),
}

pub type Result<T> = std::result::Result<T, CliError>;
