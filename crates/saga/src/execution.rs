//! Per-run saga execution state.

use common::SubjectId;
use uuid::Uuid;

use crate::events::{SagaEvent, StepFailedData};
use crate::result::SagaFailure;
use crate::state::SagaStatus;
use crate::step::SagaContext;

/// A step whose `apply` succeeded, paired with the value it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedStep {
    /// Position of the step in the saga plan.
    pub index: usize,
    /// The step name.
    pub name: String,
    /// Value to restore if the step has to be compensated.
    pub previous_value: String,
}

/// In-memory state of a single saga run.
///
/// Created at the start of an execution and owned exclusively by that run.
/// The state only changes through [`apply`](Self::apply), so it is always
/// explained by its event trail, which the reporter hands to the caller.
#[derive(Debug, Clone)]
pub struct SagaExecutionState {
    saga_id: Uuid,
    subject_id: Option<SubjectId>,
    status: SagaStatus,
    completed: Vec<CompletedStep>,
    compensated: Vec<String>,
    compensation_failures: Vec<StepFailedData>,
    failure: Option<SagaFailure>,
    events: Vec<SagaEvent>,
}

impl SagaExecutionState {
    /// Creates the state for a new run.
    pub fn new(saga_id: Uuid) -> Self {
        Self {
            saga_id,
            subject_id: None,
            status: SagaStatus::Running,
            completed: Vec::new(),
            compensated: Vec::new(),
            compensation_failures: Vec::new(),
            failure: None,
            events: Vec::new(),
        }
    }

    /// Applies an event, recording it in the trail.
    pub fn apply(&mut self, event: SagaEvent) {
        tracing::trace!(saga_id = %self.saga_id, event = event.event_type(), "saga event applied");

        match &event {
            SagaEvent::SagaStarted(data) => {
                self.subject_id = Some(data.subject_id);
                self.status = SagaStatus::Running;
            }
            SagaEvent::StepStarted(_) => {}
            SagaEvent::StepCompleted(data) => {
                self.completed.push(CompletedStep {
                    index: data.step_index,
                    name: data.step_name.clone(),
                    previous_value: data.previous_value.clone(),
                });
            }
            SagaEvent::StepFailed(data) => {
                self.failure = Some(SagaFailure {
                    step: Some(data.step_name.clone()),
                    kind: data.kind.clone(),
                    message: data.error.clone(),
                });
            }
            SagaEvent::CompensationStarted(_) => {
                self.status = SagaStatus::Compensating;
            }
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated.push(data.step_name.clone());
            }
            SagaEvent::CompensationStepFailed(data) => {
                self.compensation_failures.push(data.clone());
            }
            SagaEvent::SagaCommitted(_) => {
                self.status = SagaStatus::Committed;
            }
            SagaEvent::SagaFailed(data) => {
                self.status = if data.compensation_failed {
                    SagaStatus::CompensationFailed
                } else {
                    SagaStatus::Failed
                };
                if self.failure.is_none() {
                    self.failure = Some(SagaFailure {
                        step: None,
                        kind: data.kind.clone(),
                        message: data.reason.clone(),
                    });
                }
            }
        }
        self.events.push(event);
    }

    /// Returns a read-only view of the completed steps for the next step.
    pub fn context(&self) -> SagaContext<'_> {
        SagaContext::new(&self.completed)
    }
}

// Query methods
impl SagaExecutionState {
    /// Returns the saga run ID.
    pub fn saga_id(&self) -> Uuid {
        self.saga_id
    }

    /// Returns the subject this run changes, once started.
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject_id
    }

    /// Returns the status.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Returns completed steps in completion order.
    pub fn completed_steps(&self) -> &[CompletedStep] {
        &self.completed
    }

    /// Returns the names of steps that were compensated, in compensation order.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated
    }

    /// Returns the compensations that failed.
    pub fn compensation_failures(&self) -> &[StepFailedData] {
        &self.compensation_failures
    }

    /// Returns the value captured by the first completed step.
    pub fn original_value(&self) -> Option<&str> {
        self.context().original_value()
    }

    /// Returns the root-cause failure, if any.
    pub fn failure(&self) -> Option<&SagaFailure> {
        self.failure.as_ref()
    }

    /// Returns the event trail.
    pub fn events(&self) -> &[SagaEvent] {
        &self.events
    }
}
