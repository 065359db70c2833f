//! Saga error types.

use common::SubjectId;
use thiserror::Error;
use user_store::UserStoreError;

/// Errors that can occur during saga operations.
///
/// Step failures of every kind are normalized into this type so the
/// orchestrator has a single failure path to drive compensation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SagaError {
    /// The requested change violates the intent constraints.
    #[error("Invalid saga intent: {0}")]
    InvalidIntent(String),

    /// The subject does not exist in the local store.
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: String, id: SubjectId },

    /// The target value is already held by a different subject.
    #[error("{} '{}' is already taken", capitalize(.field), .value)]
    Conflict { field: String, value: String },

    /// A downstream service could not be reached.
    #[error("Remote service '{service}' unavailable: {reason}")]
    RemoteUnavailable { service: String, reason: String },

    /// A downstream service answered with a non-success status.
    #[error("Remote service '{service}' rejected the update with status {status}: {body}")]
    RemoteRejected {
        service: String,
        status: u16,
        body: String,
    },

    /// A step did not finish within the configured step timeout.
    #[error("Step '{step}' timed out after {timeout_ms}ms")]
    Timeout { step: String, timeout_ms: u64 },

    /// The local store failed.
    #[error("Local store error: {0}")]
    Store(String),

    /// A compensation step failed.
    #[error("Compensation step '{step}' failed: {reason}")]
    CompensationFailed { step: String, reason: String },

    /// The saga was given no steps to run.
    #[error("Saga has no steps to execute")]
    NoSteps,

    /// A client or step could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SagaError {
    /// Returns a stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SagaError::InvalidIntent(_) => "invalid_intent",
            SagaError::NotFound { .. } => "not_found",
            SagaError::Conflict { .. } => "conflict",
            SagaError::RemoteUnavailable { .. } => "remote_unavailable",
            SagaError::RemoteRejected { .. } => "remote_rejected",
            SagaError::Timeout { .. } => "timeout",
            SagaError::Store(_) => "store",
            SagaError::CompensationFailed { .. } => "compensation_failed",
            SagaError::NoSteps => "no_steps",
            SagaError::Configuration(_) => "configuration",
        }
    }
}

impl From<UserStoreError> for SagaError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::UsernameTaken(value) => SagaError::Conflict {
                field: "username".to_string(),
                value,
            },
            other => SagaError::Store(other.to_string()),
        }
    }
}

/// Upper-cases the first character, used for user-facing messages.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
