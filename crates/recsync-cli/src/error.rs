use std::io;

use recsync_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] recsync_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Speaker name cannot be empty")]
    EmptyName,
    #[error("Nothing to update: pass at least one field flag")]
    NothingToUpdate,
    #[error("No {kind} found with id {id}")]
    RecordNotFound { kind: &'static str, id: String },
}
