//! Username update saga.
//!
//! Changes a user's username in the local store, then mirrors it into each
//! downstream service that stores a copy. If any downstream update fails,
//! every change already made is reverted in reverse order.

use std::sync::Arc;

use user_store::UserRepository;

use crate::error::Result;
use crate::intent::SagaIntent;
use crate::orchestrator::SagaOrchestrator;
use crate::result::SagaResult;
use crate::services::RemoteFieldService;
use crate::step::SagaStep;
use crate::steps::{LocalRecordStep, RemoteMirrorStep};

/// Saga type identifier.
pub const SAGA_TYPE: &str = "UsernameUpdate";

/// Name of the field this saga changes.
pub const FIELD_USERNAME: &str = "username";

/// Step name of the local user store update.
pub const STEP_UPDATE_LOCAL: &str = "update-local";

/// Prefix of every downstream update step name.
pub const STEP_UPDATE_REMOTE_PREFIX: &str = "update-remote";

/// Returns the step name for the downstream service `service_name`.
pub fn remote_step_name(service_name: &str) -> String {
    format!("{STEP_UPDATE_REMOTE_PREFIX}:{service_name}")
}

/// Propagates a username change across the local store and every
/// downstream service that mirrors usernames.
#[derive(Clone)]
pub struct UsernameUpdateSaga {
    orchestrator: SagaOrchestrator,
    steps: Vec<Arc<dyn SagaStep>>,
}

impl UsernameUpdateSaga {
    /// Builds the step plan: the local update first, then one step per
    /// remote service in the order given.
    pub fn new<R>(repository: R, remotes: Vec<Arc<dyn RemoteFieldService>>) -> Self
    where
        R: UserRepository + 'static,
    {
        let mut steps: Vec<Arc<dyn SagaStep>> = Vec::with_capacity(remotes.len() + 1);
        steps.push(Arc::new(LocalRecordStep::new(repository)));
        steps.extend(
            remotes
                .into_iter()
                .map(|service| Arc::new(RemoteMirrorStep::new(service)) as Arc<dyn SagaStep>),
        );

        Self {
            orchestrator: SagaOrchestrator::new(),
            steps,
        }
    }

    /// Replaces the orchestrator, e.g. to set a step timeout.
    pub fn with_orchestrator(mut self, orchestrator: SagaOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Returns the planned step names in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    /// Changes the username of `user_id` to `new_username` everywhere.
    ///
    /// Returns `Err` only when the request itself is invalid. Every
    /// outcome of an executed saga, including failures, is reported
    /// through the returned [`SagaResult`].
    #[tracing::instrument(skip(self), fields(saga_type = SAGA_TYPE))]
    pub async fn update_username(&self, user_id: i64, new_username: &str) -> Result<SagaResult> {
        let intent = SagaIntent::new(user_id, FIELD_USERNAME, new_username)?;
        Ok(self.orchestrator.execute(&intent, &self.steps).await)
    }
}

impl std::fmt::Debug for UsernameUpdateSaga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameUpdateSaga")
            .field("orchestrator", &self.orchestrator)
            .field("steps", &self.step_names())
            .finish()
    }
}
