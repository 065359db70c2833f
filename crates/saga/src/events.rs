//! Saga execution events.
//!
//! Every change to a [`SagaExecutionState`](crate::SagaExecutionState) is
//! expressed as one of these events. The trail is kept in memory for the
//! lifetime of a single run and returned to the caller; it is never persisted.

use chrono::{DateTime, Utc};
use common::SubjectId;
use serde::Serialize;
use uuid::Uuid;

use crate::error::SagaError;

/// Events that can occur during saga execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A saga step started execution.
    StepStarted(StepData),

    /// A saga step completed successfully.
    StepCompleted(StepCompletedData),

    /// A saga step failed.
    StepFailed(StepFailedData),

    /// Compensation started after a step failure.
    CompensationStarted(CompensationData),

    /// A compensation step completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation step failed (logged, compensation continues).
    CompensationStepFailed(StepFailedData),

    /// Every step committed.
    SagaCommitted(SagaCommittedData),

    /// Saga failed after compensation.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::SagaCommitted(_) => "SagaCommitted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaStartedData {
    /// The saga run ID.
    pub saga_id: Uuid,
    /// The subject being changed.
    pub subject_id: SubjectId,
    /// The field being changed.
    pub field_name: String,
    /// The requested value.
    pub new_value: String,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for step started and compensation completed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepData {
    /// The step name.
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCompletedData {
    /// Position of the step in the saga plan.
    pub step_index: usize,
    /// The step name.
    pub step_name: String,
    /// Value observed before the step applied its change.
    pub previous_value: String,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step_name: String,
    /// Machine-readable error kind.
    pub kind: String,
    /// Error message describing the failure.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationData {
    /// The step that triggered compensation, if any.
    pub from_step: Option<String>,
}

/// Data for SagaCommitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaCommittedData {
    /// When the saga committed.
    pub committed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaFailedData {
    /// Reason for failure.
    pub reason: String,
    /// Machine-readable kind of the root cause.
    pub kind: String,
    /// True when at least one compensation could not be applied.
    pub compensation_failed: bool,
    /// When the saga failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(
        saga_id: Uuid,
        subject_id: SubjectId,
        field_name: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            subject_id,
            field_name: field_name.into(),
            new_value: new_value.into(),
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(
        step_index: usize,
        step_name: impl Into<String>,
        previous_value: impl Into<String>,
    ) -> Self {
        SagaEvent::StepCompleted(StepCompletedData {
            step_index,
            step_name: step_name.into(),
            previous_value: previous_value.into(),
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step_name: impl Into<String>, error: &SagaError) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            kind: error.kind().to_string(),
            error: error.to_string(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: Option<&str>) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            from_step: from_step.map(String::from),
        })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(step_name: impl Into<String>, error: &SagaError) -> Self {
        SagaEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            kind: error.kind().to_string(),
            error: error.to_string(),
        })
    }

    /// Creates a SagaCommitted event.
    pub fn saga_committed() -> Self {
        SagaEvent::SagaCommitted(SagaCommittedData {
            committed_at: Utc::now(),
        })
    }

    /// Creates a SagaFailed event.
    pub fn saga_failed(error: &SagaError, compensation_failed: bool) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            reason: error.to_string(),
            kind: error.kind().to_string(),
            compensation_failed,
            failed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let error = SagaError::NoSteps;
        assert_eq!(SagaEvent::step_started("a").event_type(), "StepStarted");
        assert_eq!(
            SagaEvent::step_completed(0, "a", "old").event_type(),
            "StepCompleted"
        );
        assert_eq!(SagaEvent::step_failed("a", &error).event_type(), "StepFailed");
        assert_eq!(
            SagaEvent::compensation_started(Some("a")).event_type(),
            "CompensationStarted"
        );
        assert_eq!(
            SagaEvent::compensation_step_failed("a", &error).event_type(),
            "CompensationStepFailed"
        );
        assert_eq!(SagaEvent::saga_committed().event_type(), "SagaCommitted");
        assert_eq!(
            SagaEvent::saga_failed(&error, false).event_type(),
            "SagaFailed"
        );
    }

    #[test]
    fn test_step_failed_captures_kind_and_message() {
        let error = SagaError::RemoteUnavailable {
            service: "complaints".to_string(),
            reason: "connection refused".to_string(),
        };
        let SagaEvent::StepFailed(data) = SagaEvent::step_failed("update-remote:complaints", &error)
        else {
            panic!("expected StepFailed");
        };
        assert_eq!(data.kind, "remote_unavailable");
        assert!(data.error.contains("connection refused"));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = SagaEvent::step_completed(0, "update-local", "old.username");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StepCompleted");
        assert_eq!(json["data"]["step_index"], 0);
        assert_eq!(json["data"]["previous_value"], "old.username");
    }
}
