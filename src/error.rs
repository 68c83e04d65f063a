use std::path::PathBuf;

/// Failure to turn a fetched card payload into typed cards.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed card payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("card at position {index} has an empty id")]
    EmptyId { index: usize },
}

/// The service-account file could not be read or parsed.
///
/// Cloneable so a producer that failed to load its credential can hand the
/// same error back on every evaluation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to load service account from {}: {reason}", .path.display())]
pub struct CredentialLoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// Errors raised while preparing a stage's input from the run state.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An upstream stage has not produced output yet.
    #[error("no output recorded for stage \"{stage}\"")]
    InputUnavailable { stage: String },

    #[error(transparent)]
    CredentialLoad(#[from] CredentialLoadError),
}

impl SyncError {
    /// `InputUnavailable` means "not ready yet" rather than a real failure.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, SyncError::InputUnavailable { .. })
    }
}

/// Misuse of the append-only run state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("stage \"{0}\" already has a terminal record")]
    AlreadyFinished(String),

    #[error("stage \"{0}\" was never started")]
    NotStarted(String),
}
