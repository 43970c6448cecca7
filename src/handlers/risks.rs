//! # Risks API Handlers
//!
//! Risk CRUD; the level field is always derived from the likelihood×impact
//! matrix and never accepted from clients.

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
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, authorize, field_error, not_found};
use crate::models::risk::{self, risk_level};
use crate::repositories::{OrganizationRepository, RiskRepository};
use crate::server::AppState;

const CATEGORIES: [&str; 4] = ["security", "compliance", "operational", "legal"];
const STATUSES: [&str; 5] = ["identified", "assessed", "mitigating", "accepted", "closed"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRiskDto {
    pub title: String,
    pub description: Option<String>,
    /// security | compliance | operational | legal
    pub category: String,
    /// 1-5
    pub likelihood: i32,
    /// 1-5
    pub impact: i32,
    pub organization_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub treatment_plan: Option<String>,
    pub review_due: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRiskDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: Option<i32>,
    pub impact: Option<i32>,
    pub status: Option<String>,
    pub organization_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub treatment_plan: Option<String>,
    pub review_due: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RiskDto {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub likelihood: i32,
    pub impact: i32,
    /// low | medium | high | critical (derived)
    pub level: String,
    pub status: String,
    pub owner_id: Option<Uuid>,
    pub treatment_plan: Option<String>,
    pub review_due: Option<NaiveDate>,
    pub created_at: String,
}

impl From<risk::Model> for RiskDto {
    fn from(model: risk::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            title: model.title,
            description: model.description,
            category: model.category,
            likelihood: model.likelihood,
            impact: model.impact,
            level: model.level,
            status: model.status,
            owner_id: model.owner_id,
            treatment_plan: model.treatment_plan,
            review_due: model.review_due,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn validate_scale(name: &'static str, value: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&value) {
        return Err(field_error(name, "Must be between 1 and 5"));
    }
    Ok(())
}

/// Create a risk
#[utoipa::path(
    post,
    path = "/api/v1/risks",
    security(("bearer_auth" = [])),
    request_body = CreateRiskDto,
    responses(
        (status = 201, description = "Risk created", body = ApiResponse<RiskDto>),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "risks"
)]
pub async fn create_risk(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateRiskDto>,
) -> Result<(StatusCode, Json<ApiResponse<RiskDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageRisks, "risk.create").await?;

    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    if !CATEGORIES.contains(&request.category.as_str()) {
        return Err(field_error("category", "Unknown risk category"));
    }
    validate_scale("likelihood", request.likelihood)?;
    validate_scale("impact", request.impact)?;

    if let Some(organization_id) = &request.organization_id
        && OrganizationRepository::new(&state.db)
            .find_by_id(&tenant.0, organization_id)
            .await?
            .is_none()
    {
        return Err(not_found("Organization"));
    }

    let now = Utc::now();
    let model = risk::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        organization_id: Set(request.organization_id),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        category: Set(request.category),
        likelihood: Set(request.likelihood),
        impact: Set(request.impact),
        level: Set(risk_level(request.likelihood, request.impact).to_string()),
        status: Set("identified".to_string()),
        owner_id: Set(request.owner_id),
        treatment_plan: Set(request.treatment_plan),
        review_due: Set(request.review_due),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = RiskRepository::new(&state.db);
    let row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "risk.create").target("risk", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List risks with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/risks",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Risks listed", body = ListResponse<RiskDto>)
    ),
    tag = "risks"
)]
pub async fn list_risks(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse<RiskDto>>, ApiError> {
    if let Some(cursor) = &page.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = RiskRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list_by_tenant(&tenant.0, page.effective_limit(), page.cursor.clone())
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(RiskDto::from).collect(),
        next_cursor,
    )))
}

/// Get one risk
#[utoipa::path(
    get,
    path = "/api/v1/risks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Risk UUID")),
    responses(
        (status = 200, description = "Risk retrieved", body = ApiResponse<RiskDto>),
        (status = 404, description = "Risk not found", body = ApiError)
    ),
    tag = "risks"
)]
pub async fn get_risk(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RiskDto>>, ApiError> {
    let repo = RiskRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Risk"))?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Update a risk (level is re-derived on scale changes)
#[utoipa::path(
    patch,
    path = "/api/v1/risks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Risk UUID")),
    request_body = UpdateRiskDto,
    responses(
        (status = 200, description = "Risk updated", body = ApiResponse<RiskDto>),
        (status = 404, description = "Risk not found", body = ApiError)
    ),
    tag = "risks"
)]
pub async fn update_risk(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRiskDto>,
) -> Result<Json<ApiResponse<RiskDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageRisks, "risk.update").await?;

    let repo = RiskRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Risk"));
    }

    if let Some(category) = &request.category
        && !CATEGORIES.contains(&category.as_str())
    {
        return Err(field_error("category", "Unknown risk category"));
    }
    if let Some(status) = &request.status
        && !STATUSES.contains(&status.as_str())
    {
        return Err(field_error("status", "Unknown risk status"));
    }
    if let Some(likelihood) = request.likelihood {
        validate_scale("likelihood", likelihood)?;
    }
    if let Some(impact) = request.impact {
        validate_scale("impact", impact)?;
    }

    let mut update = risk::ActiveModel::default();
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(category) = request.category {
        update.category = Set(category);
    }
    if let Some(likelihood) = request.likelihood {
        update.likelihood = Set(likelihood);
    }
    if let Some(impact) = request.impact {
        update.impact = Set(impact);
    }
    if let Some(status) = request.status {
        update.status = Set(status);
    }
    if let Some(organization_id) = request.organization_id {
        update.organization_id = Set(Some(organization_id));
    }
    if let Some(owner_id) = request.owner_id {
        update.owner_id = Set(Some(owner_id));
    }
    if let Some(treatment_plan) = request.treatment_plan {
        update.treatment_plan = Set(Some(treatment_plan));
    }
    if let Some(review_due) = request.review_due {
        update.review_due = Set(Some(review_due));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "risk.update").target("risk", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a risk
#[utoipa::path(
    delete,
    path = "/api/v1/risks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Risk UUID")),
    responses(
        (status = 204, description = "Risk deleted"),
        (status = 404, description = "Risk not found", body = ApiError)
    ),
    tag = "risks"
)]
pub async fn delete_risk(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageRisks, "risk.delete").await?;

    let repo = RiskRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Risk"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "risk.delete").target("risk", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
