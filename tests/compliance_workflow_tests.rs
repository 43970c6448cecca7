//! Compliance record workflow: ensure operation, allowed and rejected
//! status transitions, reviewer stamping, and the dashboard percentage.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::*;
use uuid::Uuid;

async fn setup_record(
    app: &axum::Router,
    token: &str,
    tenant: Uuid,
) -> (Uuid, Uuid, Uuid) {
    let org = create_organization(app, token, tenant, "Org", json!({ "pdn_level": 2 })).await;
    let requirement = create_requirement(app, token, tenant, "REQ-1").await;

    let (status, body) = request(
        app,
        "POST",
        "/api/v1/compliance-records",
        token,
        None,
        Some(json!({ "organization_id": org, "requirement_id": requirement })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "record create failed: {body}");
    let record = body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("record id");

    (org, requirement, record)
}

async fn transition(
    app: &axum::Router,
    token: &str,
    record: Uuid,
    to: &str,
) -> (StatusCode, serde_json::Value) {
    request(
        app,
        "POST",
        &format!("/api/v1/compliance-records/{record}/status"),
        token,
        None,
        Some(json!({ "status": to })),
    )
    .await
}

#[tokio::test]
async fn happy_path_reaches_approved_with_reviewer_stamp() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (user_id, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (_, _, record) = setup_record(&app, &token, tenant).await;

    for step in ["in_progress", "pending_review"] {
        let (status, body) = transition(&app, &token, record, step).await;
        assert_eq!(status, StatusCode::OK, "step {step} failed: {body}");
        assert_eq!(body["data"]["status"], step);
    }

    let (status, body) = transition(&app, &token, record, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["reviewed_by"], json!(user_id.to_string()));
    assert!(body["data"]["reviewed_at"].is_string());
}

#[tokio::test]
async fn invalid_transitions_conflict() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (_, _, record) = setup_record(&app, &token, tenant).await;

    // Straight to approved from not_started
    let (status, body) = transition(&app, &token, record, "approved").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // Unknown status is a validation error, not a conflict
    let (status, body) = transition(&app, &token, record, "done").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn rejected_records_can_be_reworked() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (_, _, record) = setup_record(&app, &token, tenant).await;

    for step in ["in_progress", "pending_review", "rejected", "in_progress"] {
        let (status, body) = transition(&app, &token, record, step).await;
        assert_eq!(status, StatusCode::OK, "step {step} failed: {body}");
    }
}

#[tokio::test]
async fn reopening_approved_requires_admin() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, officer) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (_, admin) = create_user(&app, tenant, "admin@example.com", "admin").await;
    let (_, _, record) = setup_record(&app, &officer, tenant).await;

    for step in ["in_progress", "pending_review", "approved"] {
        let (status, _) = transition(&app, &officer, record, step).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = transition(&app, &officer, record, "in_progress").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = transition(&app, &admin, record, "in_progress").await;
    assert_eq!(status, StatusCode::OK, "admin reopen failed: {body}");
}

#[tokio::test]
async fn ensure_creates_records_for_applicable_requirements_once() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let org = create_organization(&app, &token, tenant, "Org", json!({ "pdn_level": 2 })).await;
    let requirement = create_requirement(&app, &token, tenant, "REQ-PDN").await;

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/requirements/{requirement}/rules"),
        &token,
        None,
        Some(json!([{ "pdn_levels": [1, 2, 3, 4] }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/requirements/{requirement}/applicability/recompute"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/v1/organizations/{org}/compliance-records/ensure"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["applicable"], 1);
    assert_eq!(body["data"]["created"], 1);

    // Idempotent on the second run
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/v1/organizations/{org}/compliance-records/ensure"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], 0);
}

#[tokio::test]
async fn duplicate_record_for_pair_conflicts() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;
    let (org, requirement, _) = setup_record(&app, &token, tenant).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/compliance-records",
        &token,
        None,
        Some(json!({ "organization_id": org, "requirement_id": requirement })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn dashboard_reports_compliance_percentage() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let org = create_organization(&app, &token, tenant, "Org", json!({ "pdn_level": 2 })).await;
    let req_a = create_requirement(&app, &token, tenant, "REQ-A").await;
    let req_b = create_requirement(&app, &token, tenant, "REQ-B").await;

    for req in [req_a, req_b] {
        let (status, _) = request(
            &app,
            "PUT",
            &format!("/api/v1/requirements/{req}/applicability/{org}"),
            &token,
            None,
            Some(json!({ "include": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/organizations/{org}/compliance-records/ensure"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Approve one of the two records
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/compliance-records?organization_id={org}"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let record: Uuid = body["data"][0]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("record id");

    for step in ["in_progress", "pending_review", "approved"] {
        let (status, _) = transition(&app, &token, record, step).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = request(&app, "GET", "/api/v1/dashboard", &token, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let orgs = body["data"]["organizations"].as_array().expect("org summaries");
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0]["applicable"], 2);
    assert_eq!(orgs[0]["approved"], 1);
    assert_eq!(orgs[0]["compliance_pct"], 50.0);
    assert_eq!(body["data"]["records_by_status"]["approved"], 1);
    assert_eq!(body["data"]["records_by_status"]["not_started"], 1);
}
