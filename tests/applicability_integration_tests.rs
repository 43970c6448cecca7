//! End-to-end applicability engine flow: rules, recompute, manual
//! overrides, and the override-wins invariant across recomputes.

mod test_utils;

use axum::http::StatusCode;
use serde_json::{Value, json};
use test_utils::*;
use uuid::Uuid;

async fn recompute(app: &axum::Router, token: &str, requirement: Uuid) -> Value {
    let (status, body) = request(
        app,
        "POST",
        &format!("/api/v1/requirements/{requirement}/applicability/recompute"),
        token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "recompute failed: {body}");
    body["data"].clone()
}

fn mapping_for<'a>(mappings: &'a [Value], org: &Uuid) -> Option<&'a Value> {
    mappings
        .iter()
        .find(|m| m["organization_id"] == json!(org.to_string()))
}

#[tokio::test]
async fn rules_classify_matching_organizations() {
    let (_state, app) = setup_app().await;

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let kii_org = create_organization(
        &app,
        &token,
        tenant,
        "KII Operator",
        json!({ "kii_category": 2, "sector": "energy" }),
    )
    .await;
    let plain_org = create_organization(&app, &token, tenant, "Plain Org", json!({})).await;

    let requirement = create_requirement(&app, &token, tenant, "REQ-KII").await;
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/requirements/{requirement}/rules"),
        &token,
        None,
        Some(json!([{ "kii_categories": [1, 2, 3] }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result = recompute(&app, &token, requirement).await;
    assert_eq!(result["organizations_evaluated"], 2);

    let mappings = result["mappings"].as_array().expect("mappings").clone();
    let kii_mapping = mapping_for(&mappings, &kii_org).expect("KII org mapped");
    assert_eq!(kii_mapping["source"], "automatic");
    assert!(kii_mapping["matched_rule_id"].is_string());

    assert!(
        mapping_for(&mappings, &plain_org).is_none(),
        "non-matching org must produce no row"
    );
}

#[tokio::test]
async fn manual_exclude_wins_over_rules_and_survives_recompute() {
    let (_state, app) = setup_app().await;

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let org = create_organization(
        &app,
        &token,
        tenant,
        "Org",
        json!({ "pdn_level": 3 }),
    )
    .await;
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

    // Rule matches, then the exclude overrides it
    let result = recompute(&app, &token, requirement).await;
    let mappings = result["mappings"].as_array().expect("mappings").clone();
    assert_eq!(mapping_for(&mappings, &org).expect("mapped")["source"], "automatic");

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/v1/requirements/{requirement}/applicability/{org}"),
        &token,
        None,
        Some(json!({ "include": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"], "manual_exclude");

    // Recompute must not resurrect the automatic row for the pair
    let result = recompute(&app, &token, requirement).await;
    let mappings = result["mappings"].as_array().expect("mappings").clone();
    let mapping = mapping_for(&mappings, &org).expect("override row kept");
    assert_eq!(mapping["source"], "manual_exclude");

    // Clearing the override lets the rules win again
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/requirements/{requirement}/applicability/{org}"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let result = recompute(&app, &token, requirement).await;
    let mappings = result["mappings"].as_array().expect("mappings").clone();
    assert_eq!(mapping_for(&mappings, &org).expect("mapped")["source"], "automatic");
}

#[tokio::test]
async fn manual_include_applies_without_matching_rules() {
    let (_state, app) = setup_app().await;

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let org = create_organization(&app, &token, tenant, "Org", json!({})).await;
    let requirement = create_requirement(&app, &token, tenant, "REQ-NONE").await;

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/v1/requirements/{requirement}/applicability/{org}"),
        &token,
        None,
        Some(json!({ "include": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"], "manual_include");

    // Organization view shows the pair as applicable
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/organizations/{org}/applicability"),
        &token,
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mappings = body["data"].as_array().expect("mappings");
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0]["requirement_id"], json!(requirement.to_string()));
}

#[tokio::test]
async fn employee_count_rule_bounds() {
    let (_state, app) = setup_app().await;

    let tenant = create_tenant(&app, "Tenant").await;
    let (_, token) = create_user(&app, tenant, "officer@example.com", "compliance_officer").await;

    let small = create_organization(
        &app,
        &token,
        tenant,
        "Small",
        json!({ "employee_count": 10 }),
    )
    .await;
    let large = create_organization(
        &app,
        &token,
        tenant,
        "Large",
        json!({ "employee_count": 900 }),
    )
    .await;

    let requirement = create_requirement(&app, &token, tenant, "REQ-LARGE").await;
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/v1/requirements/{requirement}/rules"),
        &token,
        None,
        Some(json!([{ "min_employee_count": 500 }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result = recompute(&app, &token, requirement).await;
    let mappings = result["mappings"].as_array().expect("mappings").clone();
    assert!(mapping_for(&mappings, &large).is_some());
    assert!(mapping_for(&mappings, &small).is_none());
}
