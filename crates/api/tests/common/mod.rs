//! Shared helpers for HTTP-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use medreview_api::auth::jwt::{generate_access_token, JwtConfig};
use medreview_api::config::ServerConfig;
use medreview_api::router::build_app_router;
use medreview_api::state::AppState;
use medreview_core::status::CaseType;
use medreview_core::types::DbId;
use medreview_db::models::case::CreateCase;
use medreview_db::models::record::CreateRecord;
use medreview_db::models::user::CreateUser;
use medreview_db::repositories::{CaseRepo, RecordRepo, UserRepo};
use medreview_events::EventBus;

const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_bulk_cases: 100,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        email: None,
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, |_| {})
}

/// Same as [`build_test_app`] with a tweaked configuration.
pub fn build_test_app_with(pool: PgPool, tweak: impl FnOnce(&mut ServerConfig)) -> Router {
    let mut config = test_config();
    tweak(&mut config);
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
    };
    build_app_router(state, &config)
}

/// Bearer token for a user.
pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, "test", &test_config().jwt).expect("token generation")
}

/// Send a request, optionally authenticated and with a JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    user_id: Option<DbId>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("authorization", format!("Bearer {}", token_for(id)));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get_as(app: Router, uri: &str, user_id: DbId) -> Response {
    send(app, Method::GET, uri, Some(user_id), None).await
}

pub async fn post_as(app: Router, uri: &str, user_id: DbId, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(user_id), Some(body)).await
}

pub async fn put_as(app: Router, uri: &str, user_id: DbId, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(user_id), Some(body)).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a status and return the body.
pub async fn expect_status(response: Response, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, username: &str, role: &str, products: &[&str]) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role: role.to_string(),
            products: products.iter().map(|p| p.to_string()).collect(),
            credential_id: None,
        },
    )
    .await
    .expect("user creation should succeed")
    .id
}

/// A reviewer holding an external credential (required for peer review).
pub async fn create_credentialed_user(
    pool: &PgPool,
    username: &str,
    role: &str,
    products: &[&str],
    credential: &str,
) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role: role.to_string(),
            products: products.iter().map(|p| p.to_string()).collect(),
            credential_id: Some(credential.to_string()),
        },
    )
    .await
    .expect("user creation should succeed")
    .id
}

/// A record with no cases on it yet.
pub async fn create_bare_record(pool: &PgPool, reference: &str, supporting_files: i32) -> DbId {
    RecordRepo::create(
        pool,
        &CreateRecord {
            external_ref: reference.to_string(),
            supporting_file_count: Some(supporting_files),
        },
    )
    .await
    .expect("record creation should succeed")
    .id
}

/// A record with two abstraction seats and a consensus case.
pub struct RecordFixture {
    pub record_id: DbId,
    pub seat_one: DbId,
    pub seat_two: DbId,
    pub consensus: DbId,
}

pub async fn create_record(pool: &PgPool, reference: &str) -> RecordFixture {
    let record = RecordRepo::create(
        pool,
        &CreateRecord {
            external_ref: reference.to_string(),
            supporting_file_count: None,
        },
    )
    .await
    .expect("record creation should succeed");

    let seat_one = open_case(pool, record.id, CaseType::Abstraction, Some(1)).await;
    let seat_two = open_case(pool, record.id, CaseType::Abstraction, Some(2)).await;
    let consensus = open_case(pool, record.id, CaseType::Consensus, None).await;

    RecordFixture {
        record_id: record.id,
        seat_one,
        seat_two,
        consensus,
    }
}

pub async fn open_case(pool: &PgPool, record_id: DbId, case_type: CaseType, seat: Option<i16>) -> DbId {
    CaseRepo::create(
        pool,
        &CreateCase {
            record_id,
            case_type_id: case_type.id(),
            seat,
            due_date: None,
        },
    )
    .await
    .expect("case creation should succeed")
    .id
}
