//! Saga orchestrator for running ordered steps with compensation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{Result, SagaError};
use crate::events::SagaEvent;
use crate::execution::SagaExecutionState;
use crate::intent::SagaIntent;
use crate::result::{SagaReporter, SagaResult};
use crate::step::SagaStep;

/// Runs an ordered list of steps against an intent.
///
/// Either every step commits, or every completed step is compensated in
/// reverse completion order before `execute` returns. Steps run strictly
/// one after another. Each run owns its own [`SagaExecutionState`], so
/// independent runs may execute concurrently. Each apply and each
/// compensation is attempted exactly once.
#[derive(Debug, Clone, Default)]
pub struct SagaOrchestrator {
    step_timeout: Option<Duration>,
}

impl SagaOrchestrator {
    /// Creates an orchestrator without a step timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every apply and compensate call to `timeout`.
    ///
    /// An elapsed timeout is a step failure like any other.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Executes the saga and reports its outcome.
    ///
    /// Never fails: step errors drive compensation and end up in the
    /// returned [`SagaResult`].
    #[tracing::instrument(
        skip(self, intent, steps),
        fields(
            saga_id = tracing::field::Empty,
            subject_id = %intent.subject_id(),
            field = intent.field_name(),
        )
    )]
    pub async fn execute(&self, intent: &SagaIntent, steps: &[Arc<dyn SagaStep>]) -> SagaResult {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let saga_id = Uuid::new_v4();
        tracing::Span::current().record("saga_id", tracing::field::display(saga_id));

        let mut state = SagaExecutionState::new(saga_id);
        state.apply(SagaEvent::saga_started(
            saga_id,
            intent.subject_id(),
            intent.field_name(),
            intent.new_value(),
        ));

        if steps.is_empty() {
            state.apply(SagaEvent::saga_failed(&SagaError::NoSteps, false));
            metrics::counter!("saga_failed_total").increment(1);
            tracing::warn!(%saga_id, "saga has no steps");
            return Self::finish(intent, &state, saga_start);
        }

        let mut step_error = None;
        for (index, step) in steps.iter().enumerate() {
            let step_name = step.name().to_string();
            tracing::info!(step = %step_name, "saga step started");
            state.apply(SagaEvent::step_started(&step_name));

            let outcome = self
                .bounded(&step_name, step.apply(intent, &state.context()))
                .await;

            match outcome {
                Ok(previous_value) => {
                    tracing::info!(step = %step_name, "saga step completed");
                    state.apply(SagaEvent::step_completed(index, &step_name, previous_value));
                }
                Err(e) => {
                    metrics::counter!("saga_step_failures_total", "step" => step_name.clone())
                        .increment(1);
                    tracing::warn!(step = %step_name, error = %e, "saga step failed");
                    state.apply(SagaEvent::step_failed(&step_name, &e));
                    step_error = Some(e);
                    break;
                }
            }
        }

        match step_error {
            None => {
                state.apply(SagaEvent::saga_committed());
                metrics::counter!("saga_committed_total").increment(1);
                tracing::info!(
                    %saga_id,
                    duration = saga_start.elapsed().as_secs_f64(),
                    "saga committed"
                );
            }
            Some(error) => self.compensate(intent, steps, &mut state, &error).await,
        }

        Self::finish(intent, &state, saga_start)
    }

    fn finish(intent: &SagaIntent, state: &SagaExecutionState, saga_start: Instant) -> SagaResult {
        metrics::histogram!("saga_duration_seconds").record(saga_start.elapsed().as_secs_f64());
        SagaReporter::report(intent, state)
    }

    /// Runs compensating actions in reverse order of completed steps.
    async fn compensate(
        &self,
        intent: &SagaIntent,
        steps: &[Arc<dyn SagaStep>],
        state: &mut SagaExecutionState,
        error: &SagaError,
    ) {
        debug_assert!(state.status().can_compensate());
        let failed_step = state.failure().and_then(|f| f.step.clone());
        state.apply(SagaEvent::compensation_started(failed_step.as_deref()));

        let completed = state.completed_steps().to_vec();
        for done in completed.iter().rev() {
            let Some(step) = steps.get(done.index) else {
                continue;
            };

            match self
                .bounded(&done.name, step.compensate(intent, &done.previous_value))
                .await
            {
                Ok(()) => {
                    tracing::info!(step = %done.name, "compensation step completed");
                    state.apply(SagaEvent::compensation_step_completed(&done.name));
                }
                Err(e) => {
                    let e = SagaError::CompensationFailed {
                        step: done.name.clone(),
                        reason: e.to_string(),
                    };
                    tracing::error!(step = %done.name, error = %e, "compensation step failed");
                    state.apply(SagaEvent::compensation_step_failed(&done.name, &e));
                }
            }
        }

        let compensation_failed = !state.compensation_failures().is_empty();
        state.apply(SagaEvent::saga_failed(error, compensation_failed));

        let saga_id = state.saga_id();
        let subject_id = intent.subject_id();
        if compensation_failed {
            metrics::counter!("saga_compensation_failed_total").increment(1);
            tracing::error!(
                %saga_id,
                %subject_id,
                reason = %error,
                unreverted = ?state
                    .compensation_failures()
                    .iter()
                    .map(|f| f.step_name.as_str())
                    .collect::<Vec<_>>(),
                "saga compensation failed, manual reconciliation required"
            );
        } else {
            metrics::counter!("saga_failed_total").increment(1);
            tracing::warn!(%saga_id, %subject_id, reason = %error, "saga failed and was rolled back");
        }
    }

    async fn bounded<T>(
        &self,
        step_name: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(limit) = self.step_timeout else {
            return call.await;
        };

        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SagaError::Timeout {
                step: step_name.to_string(),
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
