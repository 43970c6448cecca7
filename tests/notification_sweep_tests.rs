//! Notification sweep through the cron endpoint: window queries,
//! at-most-once inserts, and the in-app delivery surface.

mod test_utils;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use test_utils::*;
use uuid::Uuid;

async fn create_rule(app: &axum::Router, token: &str, event_kind: &str, days: i32) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/notification-rules",
        token,
        None,
        Some(json!({
            "name": format!("{event_kind} window"),
            "event_kind": event_kind,
            "days_before": days,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "rule create failed: {body}");
    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("rule id")
}

async fn run_cron(app: &axum::Router) -> serde_json::Value {
    let (status, body) = request(
        app,
        "POST",
        "/api/v1/cron/notifications",
        OPERATOR_TOKEN,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "cron sweep failed: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn sweep_creates_notifications_once_for_due_records() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    create_rule(&app, &token, "compliance_due", 30).await;

    let org = create_organization(&app, &token, tenant, "Org", json!({})).await;
    let requirement = create_requirement(&app, &token, tenant, "REQ-DUE").await;
    let due = (Utc::now() + Duration::days(10)).date_naive();
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/compliance-records",
        &token,
        None,
        Some(json!({
            "organization_id": org,
            "requirement_id": requirement,
            "due_date": due,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let stats = run_cron(&app).await;
    assert_eq!(stats["notifications_created"], 1);
    assert_eq!(stats["notifications_skipped_existing"], 0);

    // Second run hits the unique guard instead of duplicating
    let stats = run_cron(&app).await;
    assert_eq!(stats["notifications_created"], 0);
    assert_eq!(stats["notifications_skipped_existing"], 1);

    // Delivered through the in-app listing
    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/notifications?status=pending",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("notifications");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["target_type"], "compliance_record");
}

#[tokio::test]
async fn records_outside_the_window_are_ignored() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    create_rule(&app, &token, "compliance_due", 7).await;

    let org = create_organization(&app, &token, tenant, "Org", json!({})).await;
    let requirement = create_requirement(&app, &token, tenant, "REQ-FAR").await;
    let due = (Utc::now() + Duration::days(60)).date_naive();
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/compliance-records",
        &token,
        None,
        Some(json!({
            "organization_id": org,
            "requirement_id": requirement,
            "due_date": due,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let stats = run_cron(&app).await;
    assert_eq!(stats["notifications_created"], 0);
}

#[tokio::test]
async fn disabled_rules_do_not_fire() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let rule = create_rule(&app, &token, "evidence_expiring", 30).await;
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/api/v1/notification-rules/{rule}"),
        &token,
        None,
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let valid_until = (Utc::now() + Duration::days(5)).date_naive();
    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/evidence",
        &token,
        None,
        Some(json!({
            "title": "Antivirus config export",
            "kind": "config_export",
            "valid_until": valid_until,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let stats = run_cron(&app).await;
    assert_eq!(stats["notifications_created"], 0);
}

#[tokio::test]
async fn cron_endpoint_requires_an_operator_token() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "admin@example.com", "admin").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/cron/notifications",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn dismissing_a_notification_removes_it_from_pending() {
    let (_state, app) = setup_app().await;
    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    create_rule(&app, &token, "measure_due", 30).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/controls",
        &token,
        None,
        Some(json!({
            "code": "CTRL-01",
            "title": "Access reviews",
            "control_type": "organizational",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let control = body["data"]["id"].as_str().expect("control id").to_string();

    let due = (Utc::now() + Duration::days(3)).date_naive();
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/controls/{control}/measures"),
        &token,
        None,
        Some(json!({ "title": "Quarterly review", "due_date": due })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let stats = run_cron(&app).await;
    assert_eq!(stats["notifications_created"], 1);

    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/notifications?status=pending",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let notification = body["data"][0]["id"].as_str().expect("notification id").to_string();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/v1/notifications/{notification}/dismiss"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "dismissed");

    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/notifications?status=pending",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(0));
}
