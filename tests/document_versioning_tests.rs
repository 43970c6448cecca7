//! Document versioning, diffing, status moves and the review-due query.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::*;
use uuid::Uuid;

async fn create_document(app: &axum::Router, token: &str) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/documents",
        token,
        None,
        Some(json!({
            "title": "Information security policy",
            "doc_kind": "policy",
            "review_interval_months": 12,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "document create failed: {body}");
    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("document id")
}

async fn add_version(app: &axum::Router, token: &str, doc: Uuid, body_text: &str) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        &format!("/api/v1/documents/{doc}/versions"),
        token,
        None,
        Some(json!({ "body": body_text })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "version create failed: {body}");
    body["data"]["version"].as_i64().expect("version number")
}

#[tokio::test]
async fn versions_increment_and_store_bodies() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = create_document(&app, &token).await;
    assert_eq!(add_version(&app, &token, doc, "first").await, 1);
    assert_eq!(add_version(&app, &token, doc, "second").await, 2);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_version"], 2);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}/versions/1"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["body"], "first");
}

#[tokio::test]
async fn diff_reports_added_and_removed_lines() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = create_document(&app, &token).await;
    add_version(&app, &token, doc, "scope\nrules\nreview").await;
    add_version(&app, &token, doc, "scope\nnew rules\nreview\nappendix").await;

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}/diff?from=1&to=2"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "diff failed: {body}");
    assert_eq!(body["data"]["added"], 2);
    assert_eq!(body["data"]["removed"], 1);
    assert_eq!(body["data"]["unchanged"], 2);

    // Diffing a version against itself is empty
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}/diff?from=2&to=2"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], 0);
    assert_eq!(body["data"]["removed"], 0);

    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}/diff?from=1&to=9"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_stamps_next_review_and_new_version_resets_it() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let doc = create_document(&app, &token).await;

    // No versions yet: submitting for approval is a conflict
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/documents/{doc}/status"),
        &token,
        None,
        Some(json!({ "status": "on_approval" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    add_version(&app, &token, doc, "body").await;

    for step in ["on_approval", "approved"] {
        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/v1/documents/{doc}/status"),
            &token,
            None,
            Some(json!({ "status": step })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "step {step} failed: {body}");
    }

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert!(body["data"]["next_review_at"].is_string());

    // Adding a version moves the document back to draft and clears the date
    add_version(&app, &token, doc, "body v2").await;
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/documents/{doc}"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "draft");
    assert!(body["data"]["next_review_at"].is_null());
}

#[tokio::test]
async fn review_due_window_only_includes_documents_inside_it() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    // One-month review interval: due in ~30 days
    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/documents",
        &token,
        None,
        Some(json!({
            "title": "Short-lived order",
            "doc_kind": "order",
            "review_interval_months": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let doc: Uuid = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("document id");

    add_version(&app, &token, doc, "body").await;
    for step in ["on_approval", "approved"] {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/v1/documents/{doc}/status"),
            &token,
            None,
            Some(json!({ "status": step })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 45-day window catches it, 7-day window does not
    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/documents/review-due?within_days=45",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(1));

    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/documents/review-due?within_days=7",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(0));
}
