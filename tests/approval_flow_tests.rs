//! Approval route walks: step-role enforcement, promotion on the final
//! approve, and demotion on rejection.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::*;
use uuid::Uuid;

async fn setup_document_on_approval(app: &axum::Router, token: &str) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/documents",
        token,
        None,
        Some(json!({ "title": "PDn policy", "doc_kind": "policy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let doc: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("document id");

    let (status, _) = request(
        app,
        "POST",
        &format!("/api/v1/documents/{doc}/versions"),
        token,
        None,
        Some(json!({ "body": "policy text" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        app,
        "POST",
        &format!("/api/v1/documents/{doc}/status"),
        token,
        None,
        Some(json!({ "status": "on_approval" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    doc
}

async fn create_two_step_route(app: &axum::Router, token: &str) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/approval-routes",
        token,
        None,
        Some(json!({
            "name": "Document approval",
            "steps": [
                { "position": 0, "role": "compliance_officer" },
                { "position": 1, "role": "admin" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "route create failed: {body}");
    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("route id")
}

async fn decide(
    app: &axum::Router,
    token: &str,
    instance: Uuid,
    decision: &str,
) -> (StatusCode, serde_json::Value) {
    request(
        app,
        "POST",
        &format!("/api/v1/approvals/{instance}/decision"),
        token,
        None,
        Some(json!({ "decision": decision })),
    )
    .await
}

#[tokio::test]
async fn two_step_walk_promotes_the_document() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, officer) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (_, admin) = create_user(&app, tenant, "admin@example.com", "admin").await;

    let doc = setup_document_on_approval(&app, &officer).await;
    let route = create_two_step_route(&app, &officer).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/approvals",
        &officer,
        None,
        Some(json!({ "route_id": route, "target_type": "document", "target_id": doc })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "start failed: {body}");
    let instance: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("instance id");

    // First step requires the officer role
    let (status, body) = decide(&app, &officer, instance, "approve").await;
    assert_eq!(status, StatusCode::OK, "step 1 failed: {body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["current_step"], 1);

    // Final step completes the walk and promotes the document
    let (status, body) = decide(&app, &admin, instance, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["decisions"].as_array().map(|d| d.len()), Some(2));

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}"),
        &officer,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert!(body["data"]["next_review_at"].is_string());
}

#[tokio::test]
async fn wrong_role_cannot_decide_a_step() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, officer) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = setup_document_on_approval(&app, &officer).await;

    // Route whose first step needs an admin
    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/approval-routes",
        &officer,
        None,
        Some(json!({
            "name": "Admin only",
            "steps": [{ "position": 0, "role": "admin" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let route: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("route id");

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/approvals",
        &officer,
        None,
        Some(json!({ "route_id": route, "target_type": "document", "target_id": doc })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let instance: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("instance id");

    let (status, body) = decide(&app, &officer, instance, "approve").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn rejection_terminates_the_walk_and_demotes_the_document() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, officer) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = setup_document_on_approval(&app, &officer).await;
    let route = create_two_step_route(&app, &officer).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/approvals",
        &officer,
        None,
        Some(json!({ "route_id": route, "target_type": "document", "target_id": doc })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let instance: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("instance id");

    let (status, body) = decide(&app, &officer, instance, "reject").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");

    // A rejected instance takes no more decisions
    let (status, _) = decide(&app, &officer, instance, "approve").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}"),
        &officer,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "draft");
}

#[tokio::test]
async fn one_pending_instance_per_target() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, officer) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = setup_document_on_approval(&app, &officer).await;
    let route = create_two_step_route(&app, &officer).await;

    let start = json!({ "route_id": route, "target_type": "document", "target_id": doc });
    let (status, _) = request(&app, "POST", "/api/v1/approvals", &officer, None, Some(start.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(&app, "POST", "/api/v1/approvals", &officer, None, Some(start)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}
