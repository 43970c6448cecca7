//! Tenant isolation: rows of one tenant must be invisible to another, and
//! cross-tenant probes must look identical to missing rows.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::*;

#[tokio::test]
async fn organizations_are_scoped_per_tenant() {
    let (_state, app) = setup_app().await;

    let tenant_a = create_tenant(&app, "Tenant A").await;
    let tenant_b = create_tenant(&app, "Tenant B").await;
    let (_, token_a) = create_user(&app, tenant_a, "a@example.com", "admin").await;
    let (_, token_b) = create_user(&app, tenant_b, "b@example.com", "admin").await;

    let org_a = create_organization(&app, &token_a, tenant_a, "Org A", json!({})).await;

    // Tenant B sees an empty listing
    let (status, body) = request(&app, "GET", "/api/v1/organizations", &token_b, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(0));

    // Direct probe by ID from the wrong tenant is a plain 404
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/organizations/{org_a}"),
        &token_b,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // The owner still sees it
    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/v1/organizations/{org_a}"),
        &token_a,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn tenant_header_mismatch_is_rejected_for_users() {
    let (_state, app) = setup_app().await;

    let tenant_a = create_tenant(&app, "Tenant A").await;
    let tenant_b = create_tenant(&app, "Tenant B").await;
    let (_, token_a) = create_user(&app, tenant_a, "a@example.com", "admin").await;

    // Presenting another tenant's ID with a user token must not switch scope
    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/organizations",
        &token_a,
        Some(tenant_b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn catalog_requirements_are_visible_to_all_tenants_but_immutable() {
    let (state, app) = setup_app().await;

    compliance::seeds::seed_requirement_catalog(&state.db)
        .await
        .expect("catalog seed");

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "user@example.com", "admin").await;

    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/requirements?limit=200",
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("listing array");
    assert!(!items.is_empty(), "catalog rows should be listed");
    assert!(items.iter().all(|item| item["is_catalog"] == json!(true)));

    // Mutating a catalog row is forbidden, not hidden
    let catalog_id = items[0]["id"].as_str().expect("catalog id");
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/v1/requirements/{catalog_id}"),
        &token,
        None,
        Some(json!({ "title": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn viewer_role_cannot_mutate() {
    let (_state, app) = setup_app().await;

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, viewer_token) = create_user(&app, tenant, "viewer@example.com", "viewer").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/v1/organizations",
        &viewer_token,
        None,
        Some(json!({ "name": "Nope", "sector": "it" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Denied mutation lands in the audit trail
    let (_, admin_token) = create_user(&app, tenant, "admin@example.com", "admin").await;
    let (status, body) = request(
        &app,
        "GET",
        "/api/v1/audit-events?result=denied",
        &admin_token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["data"].as_array().expect("audit listing");
    assert!(
        events
            .iter()
            .any(|e| e["action"] == "organization.create" && e["result"] == "denied")
    );
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let (_state, app) = setup_app().await;

    let (status, body) = request(&app, "GET", "/api/v1/organizations", "", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}
