//! Step that mirrors the change into a downstream service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, SagaError};
use crate::intent::SagaIntent;
use crate::services::{RemoteFieldService, RemoteUpdateRequest};
use crate::step::{SagaContext, SagaStep};
use crate::username_update::remote_step_name;

/// Propagates the new value to a downstream service that mirrors it.
///
/// The old value sent downstream is the subject's value before the saga
/// started, so this step must run after the step that owns the record.
#[derive(Clone)]
pub struct RemoteMirrorStep {
    service: Arc<dyn RemoteFieldService>,
    name: String,
}

impl RemoteMirrorStep {
    /// Creates a step that updates the given service.
    pub fn new(service: Arc<dyn RemoteFieldService>) -> Self {
        let name = remote_step_name(service.service_name());
        Self { service, name }
    }

    fn forward_request(intent: &SagaIntent, old_value: &str) -> RemoteUpdateRequest {
        RemoteUpdateRequest {
            subject_id: intent.subject_id(),
            old_value: old_value.to_string(),
            new_value: intent.new_value().to_string(),
        }
    }
}

impl std::fmt::Debug for RemoteMirrorStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMirrorStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SagaStep for RemoteMirrorStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, intent: &SagaIntent, context: &SagaContext<'_>) -> Result<String> {
        let old_value = context.original_value().ok_or_else(|| {
            SagaError::InvalidIntent(format!(
                "step '{}' needs the original value captured by an earlier step",
                self.name
            ))
        })?;

        let request = Self::forward_request(intent, old_value);
        self.service.update_field(&request).await?;

        tracing::info!(
            service = self.service.service_name(),
            subject_id = %intent.subject_id(),
            "mirrored change to remote service"
        );
        Ok(old_value.to_string())
    }

    async fn compensate(&self, intent: &SagaIntent, previous_value: &str) -> Result<()> {
        let request = Self::forward_request(intent, previous_value).reversed();
        self.service.update_field(&request).await?;

        tracing::info!(
            service = self.service.service_name(),
            subject_id = %intent.subject_id(),
            restored = previous_value,
            "reverted change in remote service"
        );
        Ok(())
    }
}
