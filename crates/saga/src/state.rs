//! Saga state machine.

use serde::Serialize;

/// The status of a saga execution.
///
/// State transitions:
/// ```text
/// Running ──┬──► Committed
///           └──► Compensating ──┬──► Failed
///                               └──► CompensationFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// Saga steps are being executed.
    #[default]
    Running,

    /// A step failed and compensating actions are in progress.
    Compensating,

    /// All steps completed successfully (terminal state).
    Committed,

    /// A step failed and every completed step was reverted (terminal state).
    Failed,

    /// A step failed and at least one compensation also failed (terminal
    /// state). The system may be inconsistent and needs manual follow-up.
    CompensationFailed,
}

impl SagaStatus {
    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaStatus::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaStatus::Committed | SagaStatus::Failed | SagaStatus::CompensationFailed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Running => "running",
            SagaStatus::Compensating => "compensating",
            SagaStatus::Committed => "committed",
            SagaStatus::Failed => "failed",
            SagaStatus::CompensationFailed => "compensation_failed",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
