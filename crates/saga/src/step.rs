//! The unit of work executed by the orchestrator.

use async_trait::async_trait;

use crate::error::Result;
use crate::execution::CompletedStep;
use crate::intent::SagaIntent;

/// A step in a saga that can be applied and compensated.
///
/// Every step whose `apply` returns `Ok` must be able to restore the value
/// it returned through `compensate`.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Human-readable name for logging and reporting.
    fn name(&self) -> &str;

    /// Performs the change and returns the value it replaced.
    ///
    /// `context` exposes the steps completed earlier in the same run.
    async fn apply(&self, intent: &SagaIntent, context: &SagaContext<'_>) -> Result<String>;

    /// Reverts the change by restoring `previous_value`.
    ///
    /// Must succeed when the value already equals `previous_value`, so it is
    /// safe to call after a partial apply or twice in a row.
    async fn compensate(&self, intent: &SagaIntent, previous_value: &str) -> Result<()>;
}

/// Read-only view of what earlier steps of the same run produced.
#[derive(Debug, Clone, Copy)]
pub struct SagaContext<'a> {
    completed: &'a [CompletedStep],
}

impl<'a> SagaContext<'a> {
    /// Wraps a list of completed steps.
    pub fn new(completed: &'a [CompletedStep]) -> Self {
        Self { completed }
    }

    /// Returns an empty context, as seen by the first step.
    pub fn empty() -> SagaContext<'static> {
        SagaContext { completed: &[] }
    }

    /// Returns the completed steps in completion order.
    pub fn completed_steps(&self) -> &'a [CompletedStep] {
        self.completed
    }

    /// Returns the value captured by the first completed step.
    ///
    /// This is the subject's value before the saga started.
    pub fn original_value(&self) -> Option<&'a str> {
        self.completed.first().map(|s| s.previous_value.as_str())
    }
}
