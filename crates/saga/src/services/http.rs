//! HTTP client for downstream services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::remote::{RemoteFieldService, RemoteUpdateRequest};
use crate::error::SagaError;

/// Timeout applied to every remote call unless configured otherwise.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Downstream service reached over HTTP.
///
/// Each update is a single `PUT` of a JSON [`RemoteUpdateRequest`] to
/// `base_url + path`. Any 2xx status counts as acknowledgement.
#[derive(Debug, Clone)]
pub struct HttpRemoteService {
    name: String,
    url: String,
    timeout: Duration,
    client: Client,
}

impl HttpRemoteService {
    /// Creates a client for the service at `base_url`, updating through `path`.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Self, SagaError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SagaError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        Ok(Self {
            name: name.into(),
            url,
            timeout,
            client,
        })
    }

    /// Returns the full update endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, err: &reqwest::Error) -> SagaError {
        let reason = if err.is_timeout() {
            format!("request timed out after {}ms", self.timeout.as_millis())
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        SagaError::RemoteUnavailable {
            service: self.name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl RemoteFieldService for HttpRemoteService {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn update_field(&self, request: &RemoteUpdateRequest) -> Result<(), SagaError> {
        let response = self
            .client
            .put(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.unavailable(&e))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(service = %self.name, status = status.as_u16(), "Remote update acknowledged");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SagaError::RemoteRejected {
            service: self.name.clone(),
            status: status.as_u16(),
            body,
        })
    }
}
