//! Error taxonomy shared by the store, repository and lifecycle engine.

use crate::fields::Status;
use crate::lifecycle::Transition;

/// Failures raised by a key-value store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store holds malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not allowed: {0}")]
    Authorization(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Deliberately does not say whether the email or the passphrase was wrong.
    #[error("invalid email or password")]
    Authentication,

    #[error("cannot {transition} a task that is {from}")]
    InvalidTransition { from: Status, transition: Transition },

    #[error("no user is signed in; run `bt login` first")]
    NotSignedIn,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    pub fn task_not_found(id: u64) -> Self {
        TrackerError::NotFound { entity: "Task", id }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
