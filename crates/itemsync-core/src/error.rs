use thiserror::Error;

/// Errors from setup and collaborator plumbing.
///
/// The sync operations themselves never surface these to callers; a failed
/// collaborator call during a run is logged and absorbed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("deferral store error: {0}")]
    Store(String),

    #[error("host scheduler rejected job {id}: {reason}")]
    Schedule { id: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
