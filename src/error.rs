use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::history::GitError;
use crate::identity::MappingError;

/// Errors that abort a statistics run.
#[derive(Debug, Error)]
pub enum StatError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("result file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
