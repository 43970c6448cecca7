#![allow(dead_code)]

//! Shared helpers for integration tests: in-memory SQLite app setup and
//! request plumbing through `tower::ServiceExt`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use migration::{Migrator, MigratorTrait};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use compliance::config::AppConfig;
use compliance::db::init_pool;
use compliance::server::{AppState, create_app, create_test_app_state};

pub const OPERATOR_TOKEN: &str = "test-operator-token";

/// Build an app over a fresh in-memory SQLite database with migrations
/// applied. A single pooled connection keeps the in-memory database alive
/// and shared.
pub async fn setup_app() -> (AppState, Router) {
    let config = AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        seed_catalog: false,
        ..Default::default()
    };

    let db = init_pool(&config).await.expect("test DB pool");
    Migrator::up(&db, None).await.expect("migrations");

    let state = create_test_app_state(config, db);
    let app = create_app(state.clone());
    (state, app)
}

/// Issue one request and return (status, parsed JSON body).
///
/// An empty body parses as JSON null.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    tenant: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");

    if let Some(tenant) = tenant {
        builder = builder.header("X-Tenant-Id", tenant.to_string());
    }

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request build"))
        .await
        .expect("request dispatch");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Create a tenant through the operator API.
pub async fn create_tenant(app: &Router, name: &str) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/tenants",
        OPERATOR_TOKEN,
        None,
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "tenant create failed: {body}");

    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("tenant id in response")
}

/// Create a user and return (user_id, bearer_token).
pub async fn create_user(app: &Router, tenant: Uuid, email: &str, role: &str) -> (Uuid, String) {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/users",
        OPERATOR_TOKEN,
        Some(tenant),
        Some(json!({ "email": email, "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "user create failed: {body}");

    let id = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("user id in response");
    let token = body["data"]["token"]
        .as_str()
        .expect("one-time token in response")
        .to_string();
    (id, token)
}

/// Create an organization and return its ID.
pub async fn create_organization(
    app: &Router,
    token: &str,
    tenant: Uuid,
    name: &str,
    profile: Value,
) -> Uuid {
    let mut payload = json!({ "name": name, "sector": "it" });
    if let (Some(base), Some(extra)) = (payload.as_object_mut(), profile.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }

    let (status, body) = request(
        app,
        "POST",
        "/api/v1/organizations",
        token,
        Some(tenant),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "org create failed: {body}");

    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("organization id in response")
}

/// Create a tenant-local requirement and return its ID.
pub async fn create_requirement(app: &Router, token: &str, tenant: Uuid, code: &str) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/requirements",
        token,
        Some(tenant),
        Some(json!({
            "code": code,
            "title": format!("Requirement {code}"),
            "regulator": "internal",
            "category": "general",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "requirement create failed: {body}");

    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("requirement id in response")
}
