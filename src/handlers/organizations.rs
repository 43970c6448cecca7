//! # Organizations API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, authorize, field_error, not_found};
use crate::models::organization;
use crate::repositories::OrganizationRepository;
use crate::server::AppState;

/// Request payload for creating an organization
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationDto {
    #[schema(example = "ООО Пример")]
    pub name: String,
    /// Russian tax identifier, 10 or 12 digits
    pub inn: Option<String>,
    #[schema(example = "energy")]
    pub sector: String,
    /// KII significance category (0-3)
    #[serde(default)]
    pub kii_category: i32,
    /// Personal-data protection level (0-4)
    #[serde(default)]
    pub pdn_level: i32,
    #[serde(default)]
    pub employee_count: i32,
    #[serde(default)]
    pub is_financial: bool,
}

/// Request payload for updating an organization
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrganizationDto {
    pub name: Option<String>,
    pub inn: Option<String>,
    pub sector: Option<String>,
    pub kii_category: Option<i32>,
    pub pdn_level: Option<i32>,
    pub employee_count: Option<i32>,
    pub is_financial: Option<bool>,
}

/// Organization representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrganizationDto {
    pub id: Uuid,
    pub name: String,
    pub inn: Option<String>,
    pub sector: String,
    pub kii_category: i32,
    pub pdn_level: i32,
    pub employee_count: i32,
    pub is_financial: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<organization::Model> for OrganizationDto {
    fn from(model: organization::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            inn: model.inn,
            sector: model.sector,
            kii_category: model.kii_category,
            pdn_level: model.pdn_level,
            employee_count: model.employee_count,
            is_financial: model.is_financial,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

static INN_PATTERN: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^\d{10}(\d{2})?$").expect("static pattern"));

/// INN is 10 digits for legal entities, 12 for sole proprietors.
pub(crate) fn validate_inn(inn: &str) -> Result<(), ApiError> {
    if !INN_PATTERN.is_match(inn) {
        return Err(field_error("inn", "Must be 10 or 12 digits"));
    }
    Ok(())
}

fn validate_profile(
    kii_category: i32,
    pdn_level: i32,
    employee_count: i32,
) -> Result<(), ApiError> {
    if !(0..=3).contains(&kii_category) {
        return Err(field_error("kii_category", "Must be between 0 and 3"));
    }
    if !(0..=4).contains(&pdn_level) {
        return Err(field_error("pdn_level", "Must be between 0 and 4"));
    }
    if employee_count < 0 {
        return Err(field_error("employee_count", "Must not be negative"));
    }
    Ok(())
}

/// Create an organization
#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    security(("bearer_auth" = [])),
    request_body = CreateOrganizationDto,
    responses(
        (status = 201, description = "Organization created", body = ApiResponse<OrganizationDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Name already in use", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateOrganizationDto>,
) -> Result<(StatusCode, Json<ApiResponse<OrganizationDto>>), ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageOrganizations,
        "organization.create",
    )
    .await?;

    if request.name.trim().is_empty() {
        return Err(field_error("name", "Must not be empty"));
    }
    if request.sector.trim().is_empty() {
        return Err(field_error("sector", "Must not be empty"));
    }
    if let Some(inn) = &request.inn {
        validate_inn(inn)?;
    }
    validate_profile(request.kii_category, request.pdn_level, request.employee_count)?;

    let now = Utc::now();
    let model = organization::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        name: Set(request.name.trim().to_string()),
        inn: Set(request.inn),
        sector: Set(request.sector.trim().to_string()),
        kii_category: Set(request.kii_category),
        pdn_level: Set(request.pdn_level),
        employee_count: Set(request.employee_count),
        is_financial: Set(request.is_financial),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = OrganizationRepository::new(&state.db);
    let org = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "organization.create").target("organization", org.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(org.into()))))
}

/// List organizations with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Organizations listed", body = ListResponse<OrganizationDto>)
    ),
    tag = "organizations"
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse<OrganizationDto>>, ApiError> {
    if let Some(cursor) = &page.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = OrganizationRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list_by_tenant(&tenant.0, page.effective_limit(), page.cursor.clone())
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(OrganizationDto::from).collect(),
        next_cursor,
    )))
}

/// Get one organization
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID")),
    responses(
        (status = 200, description = "Organization retrieved", body = ApiResponse<OrganizationDto>),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrganizationDto>>, ApiError> {
    let repo = OrganizationRepository::new(&state.db);
    let org = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Organization"))?;

    Ok(Json(ApiResponse::new(org.into())))
}

/// Update an organization's profile attributes
#[utoipa::path(
    patch,
    path = "/api/v1/organizations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID")),
    request_body = UpdateOrganizationDto,
    responses(
        (status = 200, description = "Organization updated", body = ApiResponse<OrganizationDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn update_organization(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrganizationDto>,
) -> Result<Json<ApiResponse<OrganizationDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageOrganizations,
        "organization.update",
    )
    .await?;

    let repo = OrganizationRepository::new(&state.db);
    let existing = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Organization"))?;

    if let Some(inn) = &request.inn {
        validate_inn(inn)?;
    }
    validate_profile(
        request.kii_category.unwrap_or(existing.kii_category),
        request.pdn_level.unwrap_or(existing.pdn_level),
        request.employee_count.unwrap_or(existing.employee_count),
    )?;

    let mut update = organization::ActiveModel::default();
    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(field_error("name", "Must not be empty"));
        }
        update.name = Set(name.trim().to_string());
    }
    if let Some(inn) = request.inn {
        update.inn = Set(Some(inn));
    }
    if let Some(sector) = request.sector {
        if sector.trim().is_empty() {
            return Err(field_error("sector", "Must not be empty"));
        }
        update.sector = Set(sector.trim().to_string());
    }
    if let Some(kii_category) = request.kii_category {
        update.kii_category = Set(kii_category);
    }
    if let Some(pdn_level) = request.pdn_level {
        update.pdn_level = Set(pdn_level);
    }
    if let Some(employee_count) = request.employee_count {
        update.employee_count = Set(employee_count);
    }
    if let Some(is_financial) = request.is_financial {
        update.is_financial = Set(is_financial);
    }

    let org = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "organization.update").target("organization", org.id),
    )
    .await;

    Ok(Json(ApiResponse::new(org.into())))
}

/// Delete an organization and its dependent rows
#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageOrganizations,
        "organization.delete",
    )
    .await?;

    let repo = OrganizationRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Organization"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "organization.delete").target("organization", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inn_validation() {
        assert!(validate_inn("7707083893").is_ok());
        assert!(validate_inn("770708389312").is_ok());
        assert!(validate_inn("77070838").is_err());
        assert!(validate_inn("77070838931").is_err());
        assert!(validate_inn("77070838ab").is_err());
    }

    #[test]
    fn profile_bounds() {
        assert!(validate_profile(0, 0, 0).is_ok());
        assert!(validate_profile(3, 4, 10).is_ok());
        assert!(validate_profile(4, 0, 0).is_err());
        assert!(validate_profile(0, 5, 0).is_err());
        assert!(validate_profile(0, 0, -1).is_err());
    }
}
