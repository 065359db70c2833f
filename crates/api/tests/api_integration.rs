//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::SubjectId;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryRemoteService, RemoteFieldService};
use tower::ServiceExt;
use user_store::{InMemoryUserRepository, NewUser};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    users: InMemoryUserRepository,
    complaints: InMemoryRemoteService,
}

/// Users 1..=9, where user 6 is "old.username" and user 9 owns "taken.username".
async fn seeded_users() -> InMemoryUserRepository {
    InMemoryUserRepository::with_users((1..=9).map(|n| match n {
        6 => NewUser::new("old.username", "old@example.com"),
        9 => NewUser::new("taken.username", "taken@example.com"),
        n => NewUser::new(format!("user.{n}"), format!("user{n}@example.com")),
    }))
    .await
    .unwrap()
}

async fn setup() -> TestApp {
    let users = seeded_users().await;
    let complaints = InMemoryRemoteService::new("complaints");
    complaints.seed(id(6), "old.username").await;

    let remotes: Vec<Arc<dyn RemoteFieldService>> = vec![Arc::new(complaints.clone())];
    let state = api::create_state(users.clone(), remotes);
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        users,
        complaints,
    }
}

fn id(raw: i64) -> SubjectId {
    SubjectId::new(raw).unwrap()
}

fn put_username(user_id: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/users/{user_id}/username"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_update_username_commits() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["userId"], 6);
    assert_eq!(json["oldUsername"], "old.username");
    assert_eq!(json["newUsername"], "new.username");
    assert_eq!(json["status"], "committed");
    assert_eq!(
        json["message"],
        "Username successfully updated from 'old.username' to 'new.username'"
    );
    assert!(json["sagaId"].as_str().is_some());
    assert!(json.get("error").is_none());

    assert_eq!(t.users.username_of(id(6)).await.as_deref(), Some("new.username"));
    assert_eq!(t.complaints.values_for(id(6)).await, vec!["new.username"]);
}

#[tokio::test]
async fn test_username_is_stored_verbatim() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": " new.username " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["newUsername"], " new.username ");
    assert_eq!(
        t.users.username_of(id(6)).await.as_deref(),
        Some(" new.username ")
    );
    assert_eq!(t.complaints.values_for(id(6)).await, vec![" new.username "]);
}

#[tokio::test]
async fn test_taken_username_is_bad_request() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "taken.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["details"], "Username 'taken.username' is already taken");
    assert_eq!(json["compensationOutcome"], "not needed");
    assert_eq!(t.complaints.call_count().await, 0);
    assert_eq!(t.users.username_of(id(6)).await.as_deref(), Some("old.username"));
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        put_username("404", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["details"], "User with ID 404 not found");
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        put_username("abc", serde_json::json!({ "username": "new.username" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid user ID: abc");

    let (status, _) = send(
        &t.app,
        put_username("0", serde_json::json!({ "username": "new.username" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&t.app, put_username("6", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Username is required");

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid request");

    let malformed = Request::builder()
        .method("PUT")
        .uri("/users/6/username")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&t.app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.users.update_count().await, 0);
}

#[tokio::test]
async fn test_remote_failure_is_rolled_back() {
    let t = setup().await;
    t.complaints.set_fail_on_update(true).await;

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["oldUsername"], "old.username");
    assert_eq!(json["newUsername"], "new.username");
    assert_eq!(json["error"], "SAGA transaction failed");
    assert_eq!(json["compensationOutcome"], "rolled back");
    assert_eq!(json["revertedSteps"], serde_json::json!(["update-local"]));
    assert!(json.get("warning").is_none());
    assert_eq!(t.users.username_of(id(6)).await.as_deref(), Some("old.username"));
}

#[tokio::test]
async fn test_failed_compensation_reports_warning() {
    let t = setup().await;
    t.complaints.set_fail_on_update(true).await;
    // The revert of the local write fails as well.
    t.users.set_fail_after_updates(Some(1)).await;

    let (status, json) = send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "compensation_failed");
    assert_eq!(json["compensationOutcome"], "inconsistent");
    assert_eq!(json["unrevertedSteps"], serde_json::json!(["update-local"]));
    assert!(
        json["warning"]
            .as_str()
            .unwrap()
            .contains("inconsistent state")
    );
    assert_eq!(t.users.username_of(id(6)).await.as_deref(), Some("new.username"));
}

#[tokio::test]
async fn test_default_state_calls_complaints_service_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/internal/update-assignee-username"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = api::config::Config {
        complaints_service_url: server.uri(),
        ..api::config::Config::default()
    };
    let users = seeded_users().await;
    let state = api::create_default_state(users.clone(), &config).unwrap();
    let app = api::create_app(state, get_metrics_handle());

    let (status, _) = send(
        &app,
        put_username("6", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.username_of(id(6)).await.as_deref(), Some("new.username"));
}

#[tokio::test]
async fn test_default_state_bounds_steps_with_step_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/internal/update-assignee-username"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = api::config::Config {
        complaints_service_url: server.uri(),
        step_timeout: Duration::from_millis(100),
        ..api::config::Config::default()
    };
    let users = seeded_users().await;
    let state = api::create_default_state(users.clone(), &config).unwrap();
    let app = api::create_app(state, get_metrics_handle());

    let (status, json) = send(
        &app,
        put_username("6", serde_json::json!({ "username": "new.username" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["details"],
        "Step 'update-remote:complaints' timed out after 100ms"
    );
    assert_eq!(json["compensationOutcome"], "rolled back");
    assert_eq!(users.username_of(id(6)).await.as_deref(), Some("old.username"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_saga_counters() {
    let t = setup().await;
    send(
        &t.app,
        put_username("6", serde_json::json!({ "username": "metrics.username" })),
    )
    .await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("saga_executions_total"), "{text}");
}
