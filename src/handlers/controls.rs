//! # Controls API Handlers
//!
//! Controls, requirement links, and the measures implementing them.

use axum::{
    extract::{Path, State},
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
use crate::handlers::types::{ApiResponse, authorize, field_error, not_found};
use crate::models::{control, control_measure};
use crate::repositories::{ControlRepository, RequirementRepository};
use crate::server::AppState;

const CONTROL_TYPES: [&str; 2] = ["organizational", "technical"];
const PERIODICITIES: [&str; 4] = ["once", "monthly", "quarterly", "annual"];
const MEASURE_STATUSES: [&str; 3] = ["planned", "implemented", "verified"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateControlDto {
    #[schema(example = "CTRL-01")]
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    /// organizational | technical
    pub control_type: String,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateControlDto {
    pub code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub control_type: Option<String>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlDto {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub control_type: String,
    pub owner_id: Option<Uuid>,
    pub created_at: String,
}

/// Control with its linked requirement IDs and measures
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlDetailDto {
    #[serde(flatten)]
    pub control: ControlDto,
    pub requirement_ids: Vec<Uuid>,
    pub measures: Vec<MeasureDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMeasureDto {
    pub title: String,
    pub description: Option<String>,
    /// once | monthly | quarterly | annual
    #[serde(default = "default_periodicity")]
    pub periodicity: String,
    pub due_date: Option<NaiveDate>,
}

fn default_periodicity() -> String {
    "once".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMeasureDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub periodicity: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeasureDto {
    pub id: Uuid,
    pub control_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub periodicity: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<String>,
}

impl From<control::Model> for ControlDto {
    fn from(model: control::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            title: model.title,
            description: model.description,
            control_type: model.control_type,
            owner_id: model.owner_id,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<control_measure::Model> for MeasureDto {
    fn from(model: control_measure::Model) -> Self {
        Self {
            id: model.id,
            control_id: model.control_id,
            title: model.title,
            description: model.description,
            periodicity: model.periodicity,
            status: model.status,
            due_date: model.due_date,
            completed_at: model.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Create a control
#[utoipa::path(
    post,
    path = "/api/v1/controls",
    security(("bearer_auth" = [])),
    request_body = CreateControlDto,
    responses(
        (status = 201, description = "Control created", body = ApiResponse<ControlDto>),
        (status = 409, description = "Code already in use", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn create_control(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateControlDto>,
) -> Result<(StatusCode, Json<ApiResponse<ControlDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "control.create").await?;

    if request.code.trim().is_empty() {
        return Err(field_error("code", "Must not be empty"));
    }
    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    if !CONTROL_TYPES.contains(&request.control_type.as_str()) {
        return Err(field_error("control_type", "Must be organizational or technical"));
    }

    let now = Utc::now();
    let model = control::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        code: Set(request.code.trim().to_string()),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        control_type: Set(request.control_type),
        owner_id: Set(request.owner_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = ControlRepository::new(&state.db);
    let row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "control.create").target("control", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List controls
#[utoipa::path(
    get,
    path = "/api/v1/controls",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Controls listed", body = ApiResponse<Vec<ControlDto>>)
    ),
    tag = "controls"
)]
pub async fn list_controls(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<Vec<ControlDto>>>, ApiError> {
    let repo = ControlRepository::new(&state.db);
    let rows = repo.list_by_tenant(&tenant.0).await?;

    Ok(Json(ApiResponse::new(
        rows.into_iter().map(ControlDto::from).collect(),
    )))
}

/// Get one control with links and measures
#[utoipa::path(
    get,
    path = "/api/v1/controls/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Control UUID")),
    responses(
        (status = 200, description = "Control retrieved", body = ApiResponse<ControlDetailDto>),
        (status = 404, description = "Control not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn get_control(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ControlDetailDto>>, ApiError> {
    let repo = ControlRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Control"))?;

    let requirement_ids = repo.linked_requirement_ids(&tenant.0, &id).await?;
    let measures = repo.list_measures(&tenant.0, &id).await?;

    Ok(Json(ApiResponse::new(ControlDetailDto {
        control: row.into(),
        requirement_ids,
        measures: measures.into_iter().map(MeasureDto::from).collect(),
    })))
}

/// Update a control
#[utoipa::path(
    patch,
    path = "/api/v1/controls/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Control UUID")),
    request_body = UpdateControlDto,
    responses(
        (status = 200, description = "Control updated", body = ApiResponse<ControlDto>),
        (status = 404, description = "Control not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn update_control(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateControlDto>,
) -> Result<Json<ApiResponse<ControlDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "control.update").await?;

    let repo = ControlRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Control"));
    }

    if let Some(control_type) = &request.control_type
        && !CONTROL_TYPES.contains(&control_type.as_str())
    {
        return Err(field_error("control_type", "Must be organizational or technical"));
    }

    let mut update = control::ActiveModel::default();
    if let Some(code) = request.code {
        update.code = Set(code);
    }
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(control_type) = request.control_type {
        update.control_type = Set(control_type);
    }
    if let Some(owner_id) = request.owner_id {
        update.owner_id = Set(Some(owner_id));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "control.update").target("control", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a control
#[utoipa::path(
    delete,
    path = "/api/v1/controls/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Control UUID")),
    responses(
        (status = 204, description = "Control deleted"),
        (status = 404, description = "Control not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn delete_control(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "control.delete").await?;

    let repo = ControlRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Control"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "control.delete").target("control", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Link a control to a requirement
#[utoipa::path(
    post,
    path = "/api/v1/controls/{id}/requirements/{requirement_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Control UUID"),
        ("requirement_id" = Uuid, Path, description = "Requirement UUID")
    ),
    responses(
        (status = 204, description = "Linked"),
        (status = 404, description = "Control or requirement not found", body = ApiError),
        (status = 409, description = "Already linked", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn link_requirement(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path((id, requirement_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "control.link").await?;

    let repo = ControlRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Control"));
    }
    if RequirementRepository::new(&state.db)
        .find_visible_by_id(&tenant.0, &requirement_id)
        .await?
        .is_none()
    {
        return Err(not_found("Requirement"));
    }

    repo.link_requirement(&tenant.0, &requirement_id, &id).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "control.link")
            .target("control", id)
            .details(serde_json::json!({ "requirement_id": requirement_id })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Unlink a control from a requirement
#[utoipa::path(
    delete,
    path = "/api/v1/controls/{id}/requirements/{requirement_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Control UUID"),
        ("requirement_id" = Uuid, Path, description = "Requirement UUID")
    ),
    responses(
        (status = 204, description = "Unlinked"),
        (status = 404, description = "Link not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn unlink_requirement(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path((id, requirement_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "control.unlink").await?;

    let repo = ControlRepository::new(&state.db);
    if !repo.unlink_requirement(&tenant.0, &requirement_id, &id).await? {
        return Err(not_found("Link"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Create a measure under a control
#[utoipa::path(
    post,
    path = "/api/v1/controls/{id}/measures",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Control UUID")),
    request_body = CreateMeasureDto,
    responses(
        (status = 201, description = "Measure created", body = ApiResponse<MeasureDto>),
        (status = 404, description = "Control not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn create_measure(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateMeasureDto>,
) -> Result<(StatusCode, Json<ApiResponse<MeasureDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "measure.create").await?;

    let repo = ControlRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Control"));
    }
    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    if !PERIODICITIES.contains(&request.periodicity.as_str()) {
        return Err(field_error("periodicity", "Must be once, monthly, quarterly or annual"));
    }

    let now = Utc::now();
    let model = control_measure::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        control_id: Set(id),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        periodicity: Set(request.periodicity),
        status: Set("planned".to_string()),
        due_date: Set(request.due_date),
        completed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let row = repo.create_measure(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "measure.create").target("control_measure", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List measures of a control
#[utoipa::path(
    get,
    path = "/api/v1/controls/{id}/measures",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Control UUID")),
    responses(
        (status = 200, description = "Measures listed", body = ApiResponse<Vec<MeasureDto>>),
        (status = 404, description = "Control not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn list_measures(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MeasureDto>>>, ApiError> {
    let repo = ControlRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Control"));
    }

    let rows = repo.list_measures(&tenant.0, &id).await?;
    Ok(Json(ApiResponse::new(
        rows.into_iter().map(MeasureDto::from).collect(),
    )))
}

/// Update a measure
#[utoipa::path(
    patch,
    path = "/api/v1/measures/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Measure UUID")),
    request_body = UpdateMeasureDto,
    responses(
        (status = 200, description = "Measure updated", body = ApiResponse<MeasureDto>),
        (status = 404, description = "Measure not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn update_measure(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMeasureDto>,
) -> Result<Json<ApiResponse<MeasureDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "measure.update").await?;

    let repo = ControlRepository::new(&state.db);
    if repo.find_measure(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Measure"));
    }

    if let Some(periodicity) = &request.periodicity
        && !PERIODICITIES.contains(&periodicity.as_str())
    {
        return Err(field_error("periodicity", "Must be once, monthly, quarterly or annual"));
    }
    if let Some(status) = &request.status
        && !MEASURE_STATUSES.contains(&status.as_str())
    {
        return Err(field_error("status", "Must be planned, implemented or verified"));
    }

    let mut update = control_measure::ActiveModel::default();
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(periodicity) = request.periodicity {
        update.periodicity = Set(periodicity);
    }
    if let Some(status) = request.status {
        if status == "verified" {
            update.completed_at = Set(Some(Utc::now().into()));
        }
        update.status = Set(status);
    }
    if let Some(due_date) = request.due_date {
        update.due_date = Set(Some(due_date));
    }

    let row = repo.update_measure(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "measure.update").target("control_measure", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a measure
#[utoipa::path(
    delete,
    path = "/api/v1/measures/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Measure UUID")),
    responses(
        (status = 204, description = "Measure deleted"),
        (status = 404, description = "Measure not found", body = ApiError)
    ),
    tag = "controls"
)]
pub async fn delete_measure(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageControls, "measure.delete").await?;

    let repo = ControlRepository::new(&state.db);
    if !repo.delete_measure(&tenant.0, &id).await? {
        return Err(not_found("Measure"));
    }

    Ok(StatusCode::NO_CONTENT)
}
