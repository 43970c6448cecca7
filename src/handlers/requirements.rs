//! # Requirements API Handlers
//!
//! Tenant-local requirement CRUD plus the rule-set replacement operation.
//! Shared catalog rows (tenant NULL) are visible but immutable here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::{ApiError, forbidden};
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, authorize, field_error, not_found};
use crate::models::{applicability_rule, requirement};
use crate::repositories::RequirementRepository;
use crate::repositories::requirement::NewRule;
use crate::server::AppState;

const REGULATORS: [&str; 5] = ["fstec", "fsb", "cbr", "rkn", "internal"];
const CATEGORIES: [&str; 4] = ["pdn", "kii", "financial", "general"];

/// Request payload for creating a requirement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRequirementDto {
    #[schema(example = "152-ФЗ ст.19")]
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    /// fstec | fsb | cbr | rkn | internal
    pub regulator: String,
    /// pdn | kii | financial | general
    pub category: String,
    pub effective_from: Option<NaiveDate>,
}

/// Request payload for updating a requirement
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRequirementDto {
    pub code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub regulator: Option<String>,
    pub category: Option<String>,
    pub effective_from: Option<NaiveDate>,
}

/// One applicability rule as exchanged with clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RuleDto {
    #[serde(skip_deserializing)]
    pub id: Option<Uuid>,
    pub kii_categories: Option<Vec<i32>>,
    pub pdn_levels: Option<Vec<i32>>,
    pub sectors: Option<Vec<String>>,
    pub min_employee_count: Option<i32>,
    pub max_employee_count: Option<i32>,
    pub requires_financial: Option<bool>,
}

impl From<applicability_rule::Model> for RuleDto {
    fn from(model: applicability_rule::Model) -> Self {
        let rule = crate::applicability::Rule::from(&model);
        Self {
            id: Some(model.id),
            kii_categories: rule.kii_categories,
            pdn_levels: rule.pdn_levels,
            sectors: rule.sectors,
            min_employee_count: rule.min_employee_count,
            max_employee_count: rule.max_employee_count,
            requires_financial: rule.requires_financial,
        }
    }
}

/// Requirement representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequirementDto {
    pub id: Uuid,
    /// Absent for shared catalog rows
    pub tenant_id: Option<Uuid>,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub regulator: String,
    pub category: String,
    pub effective_from: Option<NaiveDate>,
    /// True when the row comes from the shared catalog
    pub is_catalog: bool,
    pub created_at: String,
}

impl From<requirement::Model> for RequirementDto {
    fn from(model: requirement::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            is_catalog: model.tenant_id.is_none(),
            code: model.code,
            title: model.title,
            description: model.description,
            regulator: model.regulator,
            category: model.category,
            effective_from: model.effective_from,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn validate_slugs(regulator: Option<&str>, category: Option<&str>) -> Result<(), ApiError> {
    if let Some(regulator) = regulator
        && !REGULATORS.contains(&regulator)
    {
        return Err(field_error("regulator", "Unknown regulator"));
    }
    if let Some(category) = category
        && !CATEGORIES.contains(&category)
    {
        return Err(field_error("category", "Unknown category"));
    }
    Ok(())
}

fn validate_rule(rule: &RuleDto) -> Result<(), ApiError> {
    if let Some(categories) = &rule.kii_categories
        && categories.iter().any(|c| !(0..=3).contains(c))
    {
        return Err(field_error("kii_categories", "Values must be 0-3"));
    }
    if let Some(levels) = &rule.pdn_levels
        && levels.iter().any(|l| !(0..=4).contains(l))
    {
        return Err(field_error("pdn_levels", "Values must be 0-4"));
    }
    if let (Some(min), Some(max)) = (rule.min_employee_count, rule.max_employee_count)
        && min > max
    {
        return Err(field_error(
            "min_employee_count",
            "Lower bound exceeds upper bound",
        ));
    }
    Ok(())
}

/// Create a tenant-local requirement
#[utoipa::path(
    post,
    path = "/api/v1/requirements",
    security(("bearer_auth" = [])),
    request_body = CreateRequirementDto,
    responses(
        (status = 201, description = "Requirement created", body = ApiResponse<RequirementDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Code already in use", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn create_requirement(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateRequirementDto>,
) -> Result<(StatusCode, Json<ApiResponse<RequirementDto>>), ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageRequirements,
        "requirement.create",
    )
    .await?;

    if request.code.trim().is_empty() {
        return Err(field_error("code", "Must not be empty"));
    }
    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    validate_slugs(Some(&request.regulator), Some(&request.category))?;

    let now = Utc::now();
    let model = requirement::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(Some(tenant.0)),
        code: Set(request.code.trim().to_string()),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        regulator: Set(request.regulator),
        category: Set(request.category),
        effective_from: Set(request.effective_from),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = RequirementRepository::new(&state.db);
    let req = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "requirement.create").target("requirement", req.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req.into()))))
}

/// List catalog plus tenant-local requirements
#[utoipa::path(
    get,
    path = "/api/v1/requirements",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Requirements listed", body = ListResponse<RequirementDto>)
    ),
    tag = "requirements"
)]
pub async fn list_requirements(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse<RequirementDto>>, ApiError> {
    if let Some(cursor) = &page.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = RequirementRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list_visible(&tenant.0, page.effective_limit(), page.cursor.clone())
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(RequirementDto::from).collect(),
        next_cursor,
    )))
}

/// Get one requirement with its rules
#[utoipa::path(
    get,
    path = "/api/v1/requirements/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    responses(
        (status = 200, description = "Requirement retrieved", body = ApiResponse<RequirementDto>),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn get_requirement(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequirementDto>>, ApiError> {
    let repo = RequirementRepository::new(&state.db);
    let req = repo
        .find_visible_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Requirement"))?;

    Ok(Json(ApiResponse::new(req.into())))
}

/// Update a tenant-local requirement
#[utoipa::path(
    patch,
    path = "/api/v1/requirements/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    request_body = UpdateRequirementDto,
    responses(
        (status = 200, description = "Requirement updated", body = ApiResponse<RequirementDto>),
        (status = 403, description = "Catalog rows are read-only", body = ApiError),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn update_requirement(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRequirementDto>,
) -> Result<Json<ApiResponse<RequirementDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageRequirements,
        "requirement.update",
    )
    .await?;

    let repo = RequirementRepository::new(&state.db);
    let existing = repo
        .find_visible_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Requirement"))?;
    if existing.tenant_id.is_none() {
        return Err(forbidden(Some("Catalog requirements are read-only")));
    }

    validate_slugs(request.regulator.as_deref(), request.category.as_deref())?;

    let mut update = requirement::ActiveModel::default();
    if let Some(code) = request.code {
        if code.trim().is_empty() {
            return Err(field_error("code", "Must not be empty"));
        }
        update.code = Set(code.trim().to_string());
    }
    if let Some(title) = request.title {
        if title.trim().is_empty() {
            return Err(field_error("title", "Must not be empty"));
        }
        update.title = Set(title.trim().to_string());
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(regulator) = request.regulator {
        update.regulator = Set(regulator);
    }
    if let Some(category) = request.category {
        update.category = Set(category);
    }
    if let Some(effective_from) = request.effective_from {
        update.effective_from = Set(Some(effective_from));
    }

    let req = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "requirement.update").target("requirement", req.id),
    )
    .await;

    Ok(Json(ApiResponse::new(req.into())))
}

/// Delete a tenant-local requirement
#[utoipa::path(
    delete,
    path = "/api/v1/requirements/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    responses(
        (status = 204, description = "Requirement deleted"),
        (status = 403, description = "Catalog rows are read-only", body = ApiError),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn delete_requirement(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageRequirements,
        "requirement.delete",
    )
    .await?;

    let repo = RequirementRepository::new(&state.db);
    let existing = repo
        .find_visible_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Requirement"))?;
    if existing.tenant_id.is_none() {
        return Err(forbidden(Some("Catalog requirements are read-only")));
    }

    repo.delete_by_id(&tenant.0, &id).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "requirement.delete").target("requirement", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// List the applicability rules of a requirement
#[utoipa::path(
    get,
    path = "/api/v1/requirements/{id}/rules",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    responses(
        (status = 200, description = "Rules listed", body = ApiResponse<Vec<RuleDto>>),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn list_rules(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RuleDto>>>, ApiError> {
    let repo = RequirementRepository::new(&state.db);
    if repo.find_visible_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Requirement"));
    }

    let rules = repo.rules_for(&id).await?;
    Ok(Json(ApiResponse::new(
        rules.into_iter().map(RuleDto::from).collect(),
    )))
}

/// Replace the applicability rule set of a tenant-local requirement
#[utoipa::path(
    put,
    path = "/api/v1/requirements/{id}/rules",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Requirement UUID")),
    request_body = Vec<RuleDto>,
    responses(
        (status = 200, description = "Rule set replaced", body = ApiResponse<Vec<RuleDto>>),
        (status = 403, description = "Catalog rows are read-only", body = ApiError),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn replace_rules(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<Vec<RuleDto>>,
) -> Result<Json<ApiResponse<Vec<RuleDto>>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageApplicability,
        "requirement.replace_rules",
    )
    .await?;

    let repo = RequirementRepository::new(&state.db);
    let existing = repo
        .find_visible_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Requirement"))?;
    if existing.tenant_id.is_none() {
        return Err(forbidden(Some("Catalog requirements are read-only")));
    }

    for rule in &request {
        validate_rule(rule)?;
    }

    let rules = repo
        .replace_rules(
            &id,
            request
                .into_iter()
                .map(|dto| NewRule {
                    kii_categories: dto.kii_categories,
                    pdn_levels: dto.pdn_levels,
                    sectors: dto.sectors,
                    min_employee_count: dto.min_employee_count,
                    max_employee_count: dto.max_employee_count,
                    requires_financial: dto.requires_financial,
                })
                .collect(),
        )
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "requirement.replace_rules")
            .target("requirement", id),
    )
    .await;

    Ok(Json(ApiResponse::new(
        rules.into_iter().map(RuleDto::from).collect(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_validation() {
        assert!(validate_slugs(Some("fstec"), Some("kii")).is_ok());
        assert!(validate_slugs(Some("nist"), None).is_err());
        assert!(validate_slugs(None, Some("cloud")).is_err());
        assert!(validate_slugs(None, None).is_ok());
    }

    #[test]
    fn rule_bounds_validation() {
        let mut rule = RuleDto {
            id: None,
            kii_categories: Some(vec![0, 3]),
            pdn_levels: Some(vec![1, 4]),
            sectors: None,
            min_employee_count: Some(10),
            max_employee_count: Some(100),
            requires_financial: None,
        };
        assert!(validate_rule(&rule).is_ok());

        rule.kii_categories = Some(vec![5]);
        assert!(validate_rule(&rule).is_err());

        rule.kii_categories = None;
        rule.min_employee_count = Some(500);
        assert!(validate_rule(&rule).is_err());
    }
}
