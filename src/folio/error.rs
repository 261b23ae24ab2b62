use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Document can no longer be found: {0}")]
    UnresolvableIdentity(PathBuf),

    #[error("Cannot create a file reference for {path}: {reason}")]
    IdentityCreationFailed { path: PathBuf, reason: String },

    #[error("Local store commit failed: {0}")]
    LocalCommitFailed(String),

    #[error("Local store is unusable after a failed commit")]
    StorePoisoned,

    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Record already exists: {0}")]
    RecordExists(Uuid),

    #[error("A document is already open: {0}")]
    DocumentAlreadyOpen(PathBuf),

    #[error("No document is open")]
    NoOpenDocument,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FolioError {
    /// True for errors after which the local store can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FolioError::LocalCommitFailed(_) | FolioError::StorePoisoned)
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
