//! Error types for the quest framework core.

use thiserror::Error;

use crate::quest::RuntimeId;

/// Errors returned by registry, ledger and coordinator operations.
///
/// None of these are fatal to the process; callers decide whether to log,
/// ignore, or abort the operation that produced them.
#[derive(Debug, Error)]
pub enum QuestError {
    /// Malformed input to a registration or stat-recording call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Activation referenced a template that is not registered.
    #[error("unknown quest template '{0}'")]
    UnknownTemplate(String),

    /// Lookup by name or runtime ID found nothing.
    #[error("quest '{0}' not found")]
    NotFound(String),

    /// Transition attempted on a runtime ID this registry does not track.
    #[error("runtime ID {0} is not a managed quest")]
    NotManaged(RuntimeId),

    /// Reconciliation hit an impossible state; nothing was committed.
    #[error("inconsistent quest log: {0}")]
    Consistency(String),

    /// Loading or saving persisted data failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl QuestError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QuestError::Validation(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        QuestError::Consistency(msg.into())
    }
}

/// Failures of the persistence and config collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type QuestResult<T> = Result<T, QuestError>;
