//! Remote field service trait and in-memory implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::SubjectId;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::SagaError;

/// Payload asking a downstream service to rewrite every record it owns
/// that references `subject_id` from `old_value` to `new_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUpdateRequest {
    pub subject_id: SubjectId,
    pub old_value: String,
    pub new_value: String,
}

impl RemoteUpdateRequest {
    /// Returns the request that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            subject_id: self.subject_id,
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
        }
    }
}

/// Trait for downstream services that mirror a field of the subject.
#[async_trait]
pub trait RemoteFieldService: Send + Sync {
    /// Name of the downstream service, used in step names and errors.
    fn service_name(&self) -> &str;

    /// Sends a single update request. Any non-acknowledgement is an error.
    async fn update_field(&self, request: &RemoteUpdateRequest) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryRemoteState {
    records: Vec<(SubjectId, String)>,
    requests: Vec<RemoteUpdateRequest>,
    fail_on_update: bool,
    fail_after: Option<usize>,
    delay: Option<Duration>,
}

/// In-memory downstream service for testing.
///
/// Holds a list of records that reference subjects by ID and mirror their
/// field value, like complaint records carrying the assignee's username.
#[derive(Debug, Clone)]
pub struct InMemoryRemoteService {
    name: String,
    state: Arc<RwLock<InMemoryRemoteState>>,
}

impl InMemoryRemoteService {
    /// Creates a new in-memory service with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::default(),
        }
    }

    /// Adds a record referencing `subject_id` with the given mirrored value.
    pub async fn seed(&self, subject_id: SubjectId, value: impl Into<String>) {
        self.state
            .write()
            .await
            .records
            .push((subject_id, value.into()));
    }

    /// Configures the service to fail every update.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Lets `count` more calls succeed, then fails the rest.
    ///
    /// Passing `None` clears the limit.
    pub async fn set_fail_after(&self, count: Option<usize>) {
        let mut state = self.state.write().await;
        let seen = state.requests.len();
        state.fail_after = count.map(|c| seen + c);
    }

    /// Delays every call, to exercise step timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Returns the mirrored values of every record referencing `subject_id`.
    pub async fn values_for(&self, subject_id: SubjectId) -> Vec<String> {
        self.state
            .read()
            .await
            .records
            .iter()
            .filter(|(id, _)| *id == subject_id)
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Returns every request received, including failed ones.
    pub async fn requests(&self) -> Vec<RemoteUpdateRequest> {
        self.state.read().await.requests.clone()
    }

    /// Returns the number of requests received.
    pub async fn call_count(&self) -> usize {
        self.state.read().await.requests.len()
    }
}

#[async_trait]
impl RemoteFieldService for InMemoryRemoteService {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn update_field(&self, request: &RemoteUpdateRequest) -> Result<(), SagaError> {
        let delay = self.state.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        let seen = state.requests.len();
        let limit_reached = state.fail_after.is_some_and(|limit| seen >= limit);
        state.requests.push(request.clone());

        if state.fail_on_update || limit_reached {
            return Err(SagaError::RemoteUnavailable {
                service: self.name.clone(),
                reason: "service unavailable".to_string(),
            });
        }

        for (subject_id, value) in state.records.iter_mut() {
            if *subject_id == request.subject_id {
                *value = request.new_value.clone();
            }
        }
        Ok(())
    }
}
