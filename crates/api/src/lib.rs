//! HTTP API server for the username update saga.
//!
//! Exposes the saga over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{HttpRemoteService, RemoteFieldService, SagaError, SagaOrchestrator, UsernameUpdateSaga};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use user_store::{InMemoryUserRepository, NewUser, UserRepository};

use config::Config;
use routes::users::AppState;

/// Name of the downstream service that mirrors assignee usernames.
pub const COMPLAINTS_SERVICE: &str = "complaints";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users/{id}/username", put(routes::users::update_username))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given repository and
/// downstream services.
pub fn create_state<R>(repository: R, remotes: Vec<Arc<dyn RemoteFieldService>>) -> Arc<AppState>
where
    R: UserRepository + 'static,
{
    Arc::new(AppState {
        saga: UsernameUpdateSaga::new(repository, remotes),
    })
}

/// Creates the state used in production: the complaints service reached
/// over HTTP as the only downstream service, with every step bounded by
/// the configured step timeout.
pub fn create_default_state<R>(repository: R, config: &Config) -> Result<Arc<AppState>, SagaError>
where
    R: UserRepository + 'static,
{
    let complaints = HttpRemoteService::new(
        COMPLAINTS_SERVICE,
        &config.complaints_service_url,
        &config.complaints_update_path,
        config.remote_timeout,
    )?;
    tracing::info!(url = complaints.url(), "complaints service configured");

    let orchestrator = SagaOrchestrator::new().with_step_timeout(config.step_timeout);
    Ok(Arc::new(AppState {
        saga: UsernameUpdateSaga::new(repository, vec![Arc::new(complaints)])
            .with_orchestrator(orchestrator),
    }))
}

/// Creates an in-memory user store with a few demo users.
pub async fn demo_user_store() -> user_store::Result<InMemoryUserRepository> {
    InMemoryUserRepository::with_users([
        NewUser::new("admin", "admin@example.com").with_role("administrator"),
        NewUser::new("marko.vodic", "marko@example.com").with_role("vodic"),
        NewUser::new("ana.turista", "ana@example.com"),
    ])
    .await
}
