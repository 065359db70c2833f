//! Mapping a finished run onto a caller-facing outcome.

use common::SubjectId;
use serde::Serialize;
use uuid::Uuid;

use crate::error::capitalize;
use crate::events::SagaEvent;
use crate::execution::SagaExecutionState;
use crate::intent::SagaIntent;
use crate::state::SagaStatus;

/// The root cause of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaFailure {
    /// The step that failed, or None if the run failed before any step.
    pub step: Option<String>,
    /// Machine-readable error kind (see [`SagaError::kind`](crate::SagaError::kind)).
    pub kind: String,
    /// Human-readable error message.
    pub message: String,
}

/// Whether the changes of a failed run were reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationOutcome {
    /// No step had completed, so nothing had to be reverted.
    NotNeeded,
    /// Every completed step was reverted.
    RolledBack,
    /// At least one completed step could not be reverted.
    Inconsistent,
}

impl CompensationOutcome {
    /// Returns the outcome as a human-readable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompensationOutcome::NotNeeded => "not needed",
            CompensationOutcome::RolledBack => "rolled back",
            CompensationOutcome::Inconsistent => "inconsistent",
        }
    }
}

impl std::fmt::Display for CompensationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single outcome shape returned by every saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaResult {
    pub success: bool,
    pub saga_id: Uuid,
    pub subject_id: SubjectId,
    pub field_name: String,
    /// Value before the saga, once a step captured it.
    pub old_value: Option<String>,
    pub new_value: String,
    pub status: SagaStatus,
    pub message: String,
    pub error: Option<SagaFailure>,
    pub compensation_outcome: Option<CompensationOutcome>,
    pub completed_steps: Vec<String>,
    /// Steps that were compensated, in compensation order.
    pub reverted_steps: Vec<String>,
    /// Steps whose compensation failed and may need manual reconciliation.
    pub unreverted_steps: Vec<String>,
    pub warning: Option<String>,
    /// Everything that happened during the run, in order.
    pub events: Vec<SagaEvent>,
}

/// Builds [`SagaResult`]s from terminal execution states.
pub struct SagaReporter;

impl SagaReporter {
    /// Reports the outcome of a run.
    pub fn report(intent: &SagaIntent, state: &SagaExecutionState) -> SagaResult {
        let old_value = state.original_value().map(String::from);
        let completed_steps = state
            .completed_steps()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        let unreverted_steps: Vec<String> = state
            .compensation_failures()
            .iter()
            .map(|f| f.step_name.clone())
            .collect();

        let mut result = SagaResult {
            success: state.status() == SagaStatus::Committed,
            saga_id: state.saga_id(),
            subject_id: intent.subject_id(),
            field_name: intent.field_name().to_string(),
            old_value,
            new_value: intent.new_value().to_string(),
            status: state.status(),
            message: String::new(),
            error: state.failure().cloned(),
            compensation_outcome: None,
            completed_steps,
            reverted_steps: state.compensated_steps().to_vec(),
            unreverted_steps,
            warning: None,
            events: state.events().to_vec(),
        };

        let cause = state
            .failure()
            .map(|f| f.message.as_str())
            .unwrap_or("unknown error");

        match state.status() {
            SagaStatus::Committed => {
                result.message = format!(
                    "{} successfully updated from '{}' to '{}'",
                    capitalize(intent.field_name()),
                    result.old_value.as_deref().unwrap_or_default(),
                    intent.new_value()
                );
            }
            SagaStatus::Failed if state.completed_steps().is_empty() => {
                result.compensation_outcome = Some(CompensationOutcome::NotNeeded);
                result.message =
                    format!("SAGA transaction failed: {cause}; no changes were applied");
            }
            SagaStatus::Failed => {
                result.compensation_outcome = Some(CompensationOutcome::RolledBack);
                result.message = format!(
                    "SAGA transaction failed: {cause}; all changes were rolled back"
                );
            }
            SagaStatus::CompensationFailed => {
                result.compensation_outcome = Some(CompensationOutcome::Inconsistent);
                result.message =
                    format!("SAGA transaction failed: {cause}; rollback was incomplete");
                result.warning = Some(format!(
                    "System may be in an inconsistent state: could not revert {}; manual reconciliation required",
                    result.unreverted_steps.join(", ")
                ));
            }
            SagaStatus::Running | SagaStatus::Compensating => {
                result.message = format!("SAGA transaction did not finish (status {})", state.status());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SagaError;

    fn intent() -> SagaIntent {
        SagaIntent::new(6, "username", "new.username").unwrap()
    }

    fn started(intent: &SagaIntent) -> SagaExecutionState {
        let mut state = SagaExecutionState::new(Uuid::new_v4());
        state.apply(SagaEvent::saga_started(
            state.saga_id(),
            intent.subject_id(),
            intent.field_name(),
            intent.new_value(),
        ));
        state
    }

    #[test]
    fn committed_run_reports_old_and_new_values() {
        let intent = intent();
        let mut state = started(&intent);
        state.apply(SagaEvent::step_completed(0, "update-local", "old.username"));
        state.apply(SagaEvent::step_completed(1, "update-remote:complaints", "old.username"));
        state.apply(SagaEvent::saga_committed());

        let result = SagaReporter::report(&intent, &state);
        assert!(result.success);
        assert_eq!(result.status, SagaStatus::Committed);
        assert_eq!(result.old_value.as_deref(), Some("old.username"));
        assert_eq!(result.new_value, "new.username");
        assert_eq!(
            result.message,
            "Username successfully updated from 'old.username' to 'new.username'"
        );
        assert!(result.compensation_outcome.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn rolled_back_run_reports_root_cause() {
        let intent = intent();
        let mut state = started(&intent);
        let error = SagaError::Timeout {
            step: "update-remote:complaints".to_string(),
            timeout_ms: 5000,
        };
        state.apply(SagaEvent::step_completed(0, "update-local", "old.username"));
        state.apply(SagaEvent::step_failed("update-remote:complaints", &error));
        state.apply(SagaEvent::compensation_started(Some("update-remote:complaints")));
        state.apply(SagaEvent::compensation_step_completed("update-local"));
        state.apply(SagaEvent::saga_failed(&error, false));

        let result = SagaReporter::report(&intent, &state);
        assert!(!result.success);
        assert_eq!(result.compensation_outcome, Some(CompensationOutcome::RolledBack));
        assert_eq!(result.old_value.as_deref(), Some("old.username"));
        assert!(result.message.contains("timed out"));
        assert!(result.message.contains("rolled back"));
        assert!(result.warning.is_none());
        assert_eq!(result.reverted_steps, vec!["update-local".to_string()]);
        assert_eq!(result.events.len(), 6);
        assert_eq!(result.error.unwrap().kind, "timeout");
    }

    #[test]
    fn failure_before_any_step_needs_no_compensation() {
        let intent = intent();
        let mut state = started(&intent);
        let error = SagaError::NotFound {
            entity: "User".to_string(),
            id: intent.subject_id(),
        };
        state.apply(SagaEvent::step_failed("update-local", &error));
        state.apply(SagaEvent::compensation_started(Some("update-local")));
        state.apply(SagaEvent::saga_failed(&error, false));

        let result = SagaReporter::report(&intent, &state);
        assert_eq!(result.compensation_outcome, Some(CompensationOutcome::NotNeeded));
        assert!(result.old_value.is_none());
        assert!(result.completed_steps.is_empty());
        assert!(result.message.contains("User with ID 6 not found"));
    }

    #[test]
    fn compensation_failure_reports_warning_and_unreverted_steps() {
        let intent = intent();
        let mut state = started(&intent);
        let error = SagaError::RemoteUnavailable {
            service: "complaints".to_string(),
            reason: "connection refused".to_string(),
        };
        state.apply(SagaEvent::step_completed(0, "update-local", "old.username"));
        state.apply(SagaEvent::step_failed("update-remote:complaints", &error));
        state.apply(SagaEvent::compensation_started(Some("update-remote:complaints")));
        state.apply(SagaEvent::compensation_step_failed(
            "update-local",
            &SagaError::Store("write rejected".to_string()),
        ));
        state.apply(SagaEvent::saga_failed(&error, true));

        let result = SagaReporter::report(&intent, &state);
        assert_eq!(result.status, SagaStatus::CompensationFailed);
        assert_eq!(result.compensation_outcome, Some(CompensationOutcome::Inconsistent));
        assert_eq!(result.unreverted_steps, vec!["update-local".to_string()]);
        let warning = result.warning.unwrap();
        assert!(warning.contains("inconsistent state"));
        assert!(warning.contains("update-local"));
    }

    #[test]
    fn compensation_outcome_display() {
        assert_eq!(CompensationOutcome::RolledBack.to_string(), "rolled back");
        assert_eq!(CompensationOutcome::Inconsistent.to_string(), "inconsistent");
        assert_eq!(CompensationOutcome::NotNeeded.to_string(), "not needed");
    }
}
