//! # Compliance Records API Handlers
//!
//! Record creation (explicit and ensure-for-organization), listing, field
//! updates, and the workflow status transition endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, Role, TenantExtension};
use crate::error::{ApiError, conflict};
use crate::handlers::types::{ApiResponse, ListResponse, authorize, field_error, not_found};
use crate::models::compliance_record;
use crate::repositories::compliance_record::RecordFilter;
use crate::repositories::{
    ApplicabilityRepository, ComplianceRecordRepository, OrganizationRepository,
    RequirementRepository,
};
use crate::server::AppState;
use crate::workflow::{RecordStatus, can_transition};

/// Request payload for creating a record explicitly
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRecordDto {
    pub organization_id: Uuid,
    pub requirement_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request payload for updating assignment fields
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRecordDto {
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request payload for a status transition
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionDto {
    /// Target workflow status
    #[schema(example = "in_progress")]
    pub status: String,
}

/// Listing filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecordQuery {
    pub organization_id: Option<Uuid>,
    pub requirement_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

/// Compliance record representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordDto {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub requirement_id: Uuid,
    pub status: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<compliance_record::Model> for RecordDto {
    fn from(model: compliance_record::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            requirement_id: model.requirement_id,
            status: model.status,
            assignee_id: model.assignee_id,
            due_date: model.due_date,
            notes: model.notes,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at.map(|t| t.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Result of the ensure operation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnsureResultDto {
    /// Applicable requirements found for the organization
    pub applicable: usize,
    /// Records newly created by this call
    pub created: u64,
}

/// Create one compliance record explicitly
#[utoipa::path(
    post,
    path = "/api/v1/compliance-records",
    security(("bearer_auth" = [])),
    request_body = CreateRecordDto,
    responses(
        (status = 201, description = "Record created", body = ApiResponse<RecordDto>),
        (status = 404, description = "Organization or requirement not found", body = ApiError),
        (status = 409, description = "Record already exists for this pair", body = ApiError)
    ),
    tag = "compliance"
)]
pub async fn create_record(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateRecordDto>,
) -> Result<(StatusCode, Json<ApiResponse<RecordDto>>), ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageCompliance,
        "compliance.create",
    )
    .await?;

    if OrganizationRepository::new(&state.db)
        .find_by_id(&tenant.0, &request.organization_id)
        .await?
        .is_none()
    {
        return Err(not_found("Organization"));
    }
    if RequirementRepository::new(&state.db)
        .find_visible_by_id(&tenant.0, &request.requirement_id)
        .await?
        .is_none()
    {
        return Err(not_found("Requirement"));
    }

    let now = Utc::now();
    let model = compliance_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        organization_id: Set(request.organization_id),
        requirement_id: Set(request.requirement_id),
        status: Set(RecordStatus::NotStarted.as_str().to_string()),
        assignee_id: Set(request.assignee_id),
        due_date: Set(request.due_date),
        notes: Set(request.notes),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = ComplianceRecordRepository::new(&state.db);
    let record_row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "compliance.create")
            .target("compliance_record", record_row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(record_row.into()))))
}

/// Materialize records for every applicable requirement of an organization
#[utoipa::path(
    post,
    path = "/api/v1/organizations/{id}/compliance-records/ensure",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID")),
    responses(
        (status = 200, description = "Records ensured", body = ApiResponse<EnsureResultDto>),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "compliance"
)]
pub async fn ensure_records(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnsureResultDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageCompliance,
        "compliance.ensure",
    )
    .await?;

    if OrganizationRepository::new(&state.db)
        .find_by_id(&tenant.0, &organization_id)
        .await?
        .is_none()
    {
        return Err(not_found("Organization"));
    }

    let applicable = ApplicabilityRepository::new(&state.db)
        .applicable_requirement_ids(&tenant.0, &organization_id)
        .await?;

    let created = ComplianceRecordRepository::new(&state.db)
        .ensure_for_organization(&tenant.0, &organization_id, &applicable)
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "compliance.ensure")
            .target("organization", organization_id)
            .details(serde_json::json!({ "created": created })),
    )
    .await;

    Ok(Json(ApiResponse::new(EnsureResultDto {
        applicable: applicable.len(),
        created,
    })))
}

/// List compliance records
#[utoipa::path(
    get,
    path = "/api/v1/compliance-records",
    security(("bearer_auth" = [])),
    params(RecordQuery),
    responses(
        (status = 200, description = "Records listed", body = ListResponse<RecordDto>)
    ),
    tag = "compliance"
)]
pub async fn list_records(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<RecordQuery>,
) -> Result<Json<ListResponse<RecordDto>>, ApiError> {
    let status = match &query.status {
        Some(value) => Some(
            RecordStatus::parse(value).ok_or_else(|| field_error("status", "Unknown status"))?,
        ),
        None => None,
    };

    let filter = RecordFilter {
        organization_id: query.organization_id,
        requirement_id: query.requirement_id,
        status,
    };

    if let Some(cursor) = &query.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = ComplianceRecordRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list(
            &tenant.0,
            &filter,
            query.limit.unwrap_or(50).clamp(1, 200),
            query.cursor.clone(),
        )
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(RecordDto::from).collect(),
        next_cursor,
    )))
}

/// Get one compliance record
#[utoipa::path(
    get,
    path = "/api/v1/compliance-records/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Record UUID")),
    responses(
        (status = 200, description = "Record retrieved", body = ApiResponse<RecordDto>),
        (status = 404, description = "Record not found", body = ApiError)
    ),
    tag = "compliance"
)]
pub async fn get_record(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RecordDto>>, ApiError> {
    let repo = ComplianceRecordRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Compliance record"))?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Update assignment fields of a record
#[utoipa::path(
    patch,
    path = "/api/v1/compliance-records/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Record UUID")),
    request_body = UpdateRecordDto,
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<RecordDto>),
        (status = 404, description = "Record not found", body = ApiError)
    ),
    tag = "compliance"
)]
pub async fn update_record(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecordDto>,
) -> Result<Json<ApiResponse<RecordDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageCompliance,
        "compliance.update",
    )
    .await?;

    let repo = ComplianceRecordRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Compliance record"));
    }

    let mut update = compliance_record::ActiveModel::default();
    if let Some(assignee_id) = request.assignee_id {
        update.assignee_id = Set(Some(assignee_id));
    }
    if let Some(due_date) = request.due_date {
        update.due_date = Set(Some(due_date));
    }
    if let Some(notes) = request.notes {
        update.notes = Set(Some(notes));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "compliance.update")
            .target("compliance_record", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Move a record through the workflow
///
/// Invalid transitions return 409; approving or rejecting stamps the
/// reviewer fields.
#[utoipa::path(
    post,
    path = "/api/v1/compliance-records/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Record UUID")),
    request_body = TransitionDto,
    responses(
        (status = 200, description = "Transition applied", body = ApiResponse<RecordDto>),
        (status = 404, description = "Record not found", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError)
    ),
    tag = "compliance"
)]
pub async fn transition_record(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionDto>,
) -> Result<Json<ApiResponse<RecordDto>>, ApiError> {
    authorize(
        &state,
        tenant,
        &principal,
        Permission::ManageCompliance,
        "compliance.transition",
    )
    .await?;

    let target = RecordStatus::parse(&request.status)
        .ok_or_else(|| field_error("status", "Unknown status"))?;

    let repo = ComplianceRecordRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Compliance record"))?;

    let current = RecordStatus::parse(&row.status).ok_or_else(|| {
        tracing::error!(record_id = %row.id, status = %row.status, "Unknown status on record row");
        ApiError::from(crate::error::ErrorType::InternalServerError)
    })?;

    let is_admin = matches!(
        principal,
        Principal::Operator | Principal::User(crate::auth::CurrentUser { role: Role::Admin, .. })
    );

    if !can_transition(current, target, is_admin) {
        return Err(conflict(&format!(
            "Transition {} -> {} is not allowed",
            current.as_str(),
            target.as_str()
        )));
    }

    let row = repo.set_status(row, target, principal.actor_id()).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "compliance.transition")
            .target("compliance_record", row.id)
            .details(serde_json::json!({
                "from": current.as_str(),
                "to": target.as_str(),
            })),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}
