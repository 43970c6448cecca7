//! # Applicability API Handlers
//!
//! Recompute endpoint for the applicability engine plus manual
//! include/exclude overrides and mapping listings.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::applicability::{OrgProfile, Rule, classify};
use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, authorize, not_found};
use crate::models::requirement_applicability;
use crate::repositories::{
    ApplicabilityRepository, OrganizationRepository, RequirementRepository,
};
use crate::server::AppState;

/// One mapping row as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingDto {
    pub requirement_id: Uuid,
    pub organization_id: Uuid,
    /// automatic | manual_include | manual_exclude
    pub source: String,
    pub matched_rule_id: Option<Uuid>,
    pub updated_at: String,
}

impl From<requirement_applicability::Model> for MappingDto {
    fn from(model: requirement_applicability::Model) -> Self {
        Self {
            requirement_id: model.requirement_id,
            organization_id: model.organization_id,
            source: model.source,
            matched_rule_id: model.matched_rule_id,
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Result of a recompute run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecomputeResultDto {
    pub organizations_evaluated: usize,
    pub mappings: Vec<MappingDto>,
}

/// Request payload for a manual override
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OverrideDto {
    /// true = manual_include, false = manual_exclude
    pub include: bool,
}

async fn require_visible_requirement(
    state: &AppState,
    tenant: &crate::auth::TenantId,
    requirement_id: &Uuid,
) -> Result<(), ApiError> {
    let repo = RequirementRepository::new(&state.db);
    if repo
        .find_visible_by_id(&tenant.0, requirement_id)
        .await?
        .is_none()
    {
        return Err(not_found("Requirement"));
    }
    Ok(())
}

/// Re-run the applicability engine for one requirement
///
/// Replaces the automatic mapping rows from a synchronous pass over the
/// tenant's organizations; manual overrides are left untouched and keep
/// winning over rule matches.
#[utoipa::path(
    post,
    path = "/api/v1/requirements/{id}/applicability/recompute",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    responses(
        (status = 200, description = "Applicability recomputed", body = ApiResponse<RecomputeResultDto>),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "applicability"
)]
pub async fn recompute(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(requirement_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RecomputeResultDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageApplicability,
        "applicability.recompute",
    )
    .await?;

    require_visible_requirement(&state, &tenant, &requirement_id).await?;

    let organizations: Vec<OrgProfile> = OrganizationRepository::new(&state.db)
        .find_by_tenant(&tenant.0)
        .await?
        .iter()
        .map(OrgProfile::from)
        .collect();

    let rules: Vec<Rule> = RequirementRepository::new(&state.db)
        .rules_for(&requirement_id)
        .await?
        .iter()
        .map(Rule::from)
        .collect();

    let applicability = ApplicabilityRepository::new(&state.db);
    let overrides = applicability
        .manual_overrides(&tenant.0, &requirement_id)
        .await?;

    let classified = classify(&organizations, &rules, &overrides);
    applicability
        .replace_automatic(&tenant.0, &requirement_id, &classified)
        .await?;

    let mappings = applicability
        .list_for_requirement(&tenant.0, &requirement_id)
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "applicability.recompute")
            .target("requirement", requirement_id)
            .details(serde_json::json!({
                "organizations_evaluated": organizations.len(),
                "mappings": mappings.len(),
            })),
    )
    .await;

    Ok(Json(ApiResponse::new(RecomputeResultDto {
        organizations_evaluated: organizations.len(),
        mappings: mappings.into_iter().map(MappingDto::from).collect(),
    })))
}

/// List the mapping rows of one requirement
#[utoipa::path(
    get,
    path = "/api/v1/requirements/{id}/applicability",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    responses(
        (status = 200, description = "Mappings listed", body = ApiResponse<Vec<MappingDto>>),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "applicability"
)]
pub async fn list_for_requirement(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(requirement_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MappingDto>>>, ApiError> {
    require_visible_requirement(&state, &tenant, &requirement_id).await?;

    let mappings = ApplicabilityRepository::new(&state.db)
        .list_for_requirement(&tenant.0, &requirement_id)
        .await?;

    Ok(Json(ApiResponse::new(
        mappings.into_iter().map(MappingDto::from).collect(),
    )))
}

/// List the mapping rows of one organization
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}/applicability",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID")),
    responses(
        (status = 200, description = "Mappings listed", body = ApiResponse<Vec<MappingDto>>),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "applicability"
)]
pub async fn list_for_organization(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MappingDto>>>, ApiError> {
    if OrganizationRepository::new(&state.db)
        .find_by_id(&tenant.0, &organization_id)
        .await?
        .is_none()
    {
        return Err(not_found("Organization"));
    }

    let mappings = ApplicabilityRepository::new(&state.db)
        .list_for_organization(&tenant.0, &organization_id)
        .await?;

    Ok(Json(ApiResponse::new(
        mappings.into_iter().map(MappingDto::from).collect(),
    )))
}

/// Set a manual include/exclude override for one pair
#[utoipa::path(
    put,
    path = "/api/v1/requirements/{id}/applicability/{organization_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Requirement UUID"),
        ("organization_id" = Uuid, Path, description = "Organization UUID")
    ),
    request_body = OverrideDto,
    responses(
        (status = 200, description = "Override stored", body = ApiResponse<MappingDto>),
        (status = 404, description = "Requirement or organization not found", body = ApiError)
    ),
    tag = "applicability"
)]
pub async fn set_override(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path((requirement_id, organization_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<OverrideDto>,
) -> Result<Json<ApiResponse<MappingDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageApplicability,
        "applicability.set_override",
    )
    .await?;

    require_visible_requirement(&state, &tenant, &requirement_id).await?;
    if OrganizationRepository::new(&state.db)
        .find_by_id(&tenant.0, &organization_id)
        .await?
        .is_none()
    {
        return Err(not_found("Organization"));
    }

    let mapping = ApplicabilityRepository::new(&state.db)
        .set_override(&tenant.0, &requirement_id, &organization_id, request.include)
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "applicability.set_override")
            .target("requirement", requirement_id)
            .details(serde_json::json!({
                "organization_id": organization_id,
                "include": request.include,
            })),
    )
    .await;

    Ok(Json(ApiResponse::new(mapping.into())))
}

/// Remove a manual override
///
/// The pair falls back to whatever the rules say on the next recompute.
#[utoipa::path(
    delete,
    path = "/api/v1/requirements/{id}/applicability/{organization_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Requirement UUID"),
        ("organization_id" = Uuid, Path, description = "Organization UUID")
    ),
    responses(
        (status = 204, description = "Override removed"),
        (status = 404, description = "No manual override for this pair", body = ApiError)
    ),
    tag = "applicability"
)]
pub async fn clear_override(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path((requirement_id, organization_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::http::StatusCode, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageApplicability,
        "applicability.clear_override",
    )
    .await?;

    let removed = ApplicabilityRepository::new(&state.db)
        .clear_override(&tenant.0, &requirement_id, &organization_id)
        .await?;

    if !removed {
        return Err(not_found("Override"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "applicability.clear_override")
            .target("requirement", requirement_id)
            .details(serde_json::json!({ "organization_id": organization_id })),
    )
    .await;

    Ok(axum::http::StatusCode::NO_CONTENT)
}
