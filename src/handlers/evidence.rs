//! # Evidence API Handlers
//!
//! Evidence metadata CRUD and links to compliance records and control
//! measures. Binary payloads are stored elsewhere; this API keeps a
//! SHA-256 digest for integrity checks.

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
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, authorize, field_error, not_found};
use crate::models::{evidence, evidence_link};
use crate::repositories::{ComplianceRecordRepository, ControlRepository, EvidenceRepository};
use crate::server::AppState;

const EVIDENCE_KINDS: [&str; 5] = [
    "document",
    "screenshot",
    "config_export",
    "attestation",
    "log_extract",
];
const LINK_TARGETS: [&str; 2] = ["compliance_record", "control_measure"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEvidenceDto {
    pub title: String,
    pub description: Option<String>,
    /// document | screenshot | config_export | attestation | log_extract
    pub kind: String,
    pub file_name: Option<String>,
    /// SHA-256 hex digest of the artifact
    pub content_hash: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateEvidenceDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub file_name: Option<String>,
    pub content_hash: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkDto {
    /// compliance_record | control_measure
    pub target_type: String,
    pub target_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UnlinkQuery {
    pub target_type: String,
    pub target_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvidenceDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub file_name: Option<String>,
    pub content_hash: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvidenceDetailDto {
    #[serde(flatten)]
    pub evidence: EvidenceDto,
    pub links: Vec<LinkDto>,
}

impl From<evidence::Model> for EvidenceDto {
    fn from(model: evidence::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            kind: model.kind,
            file_name: model.file_name,
            content_hash: model.content_hash,
            valid_until: model.valid_until,
            uploaded_by: model.uploaded_by,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<evidence_link::Model> for LinkDto {
    fn from(model: evidence_link::Model) -> Self {
        Self {
            target_type: model.target_type,
            target_id: model.target_id,
        }
    }
}

fn validate_content_hash(hash: &str) -> Result<(), ApiError> {
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(field_error("content_hash", "Must be a SHA-256 hex digest"));
    }
    Ok(())
}

async fn ensure_link_target(
    state: &AppState,
    tenant: &crate::auth::TenantId,
    target_type: &str,
    target_id: &Uuid,
) -> Result<(), ApiError> {
    match target_type {
        "compliance_record" => {
            if ComplianceRecordRepository::new(&state.db)
                .find_by_id(&tenant.0, target_id)
                .await?
                .is_none()
            {
                return Err(not_found("Compliance record"));
            }
        }
        "control_measure" => {
            if ControlRepository::new(&state.db)
                .find_measure(&tenant.0, target_id)
                .await?
                .is_none()
            {
                return Err(not_found("Measure"));
            }
        }
        _ => {
            return Err(field_error(
                "target_type",
                "Must be compliance_record or control_measure",
            ));
        }
    }
    Ok(())
}

/// Register evidence metadata
#[utoipa::path(
    post,
    path = "/api/v1/evidence",
    security(("bearer_auth" = [])),
    request_body = CreateEvidenceDto,
    responses(
        (status = 201, description = "Evidence created", body = ApiResponse<EvidenceDto>),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn create_evidence(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateEvidenceDto>,
) -> Result<(StatusCode, Json<ApiResponse<EvidenceDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageEvidence, "evidence.create").await?;

    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    if !EVIDENCE_KINDS.contains(&request.kind.as_str()) {
        return Err(field_error("kind", "Unknown evidence kind"));
    }
    if let Some(hash) = &request.content_hash {
        validate_content_hash(hash)?;
    }

    let now = Utc::now();
    let model = evidence::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        kind: Set(request.kind),
        file_name: Set(request.file_name),
        content_hash: Set(request.content_hash),
        valid_until: Set(request.valid_until),
        uploaded_by: Set(principal.actor_id()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = EvidenceRepository::new(&state.db);
    let row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "evidence.create").target("evidence", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List evidence with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/evidence",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Evidence listed", body = ListResponse<EvidenceDto>)
    ),
    tag = "evidence"
)]
pub async fn list_evidence(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse<EvidenceDto>>, ApiError> {
    if let Some(cursor) = &page.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = EvidenceRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list_by_tenant(&tenant.0, page.effective_limit(), page.cursor.clone())
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(EvidenceDto::from).collect(),
        next_cursor,
    )))
}

/// Get one evidence item with its links
#[utoipa::path(
    get,
    path = "/api/v1/evidence/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Evidence UUID")),
    responses(
        (status = 200, description = "Evidence retrieved", body = ApiResponse<EvidenceDetailDto>),
        (status = 404, description = "Evidence not found", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn get_evidence(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EvidenceDetailDto>>, ApiError> {
    let repo = EvidenceRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Evidence"))?;

    let links = repo.links_for_evidence(&tenant.0, &id).await?;

    Ok(Json(ApiResponse::new(EvidenceDetailDto {
        evidence: row.into(),
        links: links.into_iter().map(LinkDto::from).collect(),
    })))
}

/// Update evidence metadata
#[utoipa::path(
    patch,
    path = "/api/v1/evidence/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Evidence UUID")),
    request_body = UpdateEvidenceDto,
    responses(
        (status = 200, description = "Evidence updated", body = ApiResponse<EvidenceDto>),
        (status = 404, description = "Evidence not found", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn update_evidence(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEvidenceDto>,
) -> Result<Json<ApiResponse<EvidenceDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageEvidence, "evidence.update").await?;

    let repo = EvidenceRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Evidence"));
    }

    if let Some(kind) = &request.kind
        && !EVIDENCE_KINDS.contains(&kind.as_str())
    {
        return Err(field_error("kind", "Unknown evidence kind"));
    }
    if let Some(hash) = &request.content_hash {
        validate_content_hash(hash)?;
    }

    let mut update = evidence::ActiveModel::default();
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(kind) = request.kind {
        update.kind = Set(kind);
    }
    if let Some(file_name) = request.file_name {
        update.file_name = Set(Some(file_name));
    }
    if let Some(content_hash) = request.content_hash {
        update.content_hash = Set(Some(content_hash));
    }
    if let Some(valid_until) = request.valid_until {
        update.valid_until = Set(Some(valid_until));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "evidence.update").target("evidence", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete evidence
#[utoipa::path(
    delete,
    path = "/api/v1/evidence/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Evidence UUID")),
    responses(
        (status = 204, description = "Evidence deleted"),
        (status = 404, description = "Evidence not found", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn delete_evidence(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageEvidence, "evidence.delete").await?;

    let repo = EvidenceRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Evidence"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "evidence.delete").target("evidence", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Attach evidence to a compliance record or control measure
#[utoipa::path(
    post,
    path = "/api/v1/evidence/{id}/links",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Evidence UUID")),
    request_body = LinkDto,
    responses(
        (status = 204, description = "Linked"),
        (status = 404, description = "Evidence or target not found", body = ApiError),
        (status = 409, description = "Already linked", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn link_evidence(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<LinkDto>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageEvidence, "evidence.link").await?;

    let repo = EvidenceRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Evidence"));
    }
    if !LINK_TARGETS.contains(&request.target_type.as_str()) {
        return Err(field_error(
            "target_type",
            "Must be compliance_record or control_measure",
        ));
    }
    ensure_link_target(&state, &tenant, &request.target_type, &request.target_id).await?;

    repo.link(&tenant.0, &id, &request.target_type, &request.target_id)
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "evidence.link")
            .target("evidence", id)
            .details(serde_json::json!({
                "target_type": request.target_type,
                "target_id": request.target_id,
            })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Detach evidence from a target
#[utoipa::path(
    delete,
    path = "/api/v1/evidence/{id}/links",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Evidence UUID"), UnlinkQuery),
    responses(
        (status = 204, description = "Unlinked"),
        (status = 404, description = "Link not found", body = ApiError)
    ),
    tag = "evidence"
)]
pub async fn unlink_evidence(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Query(query): Query<UnlinkQuery>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageEvidence, "evidence.unlink").await?;

    let repo = EvidenceRepository::new(&state.db);
    if !repo
        .unlink(&tenant.0, &id, &query.target_type, &query.target_id)
        .await?
    {
        return Err(not_found("Link"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_validation() {
        let valid = "a".repeat(64);
        assert!(validate_content_hash(&valid).is_ok());
        assert!(validate_content_hash("abc").is_err());
        let bad = "z".repeat(64);
        assert!(validate_content_hash(&bad).is_err());
    }
}
