//! # Documents API Handlers
//!
//! Document CRUD, immutable version history, deterministic version diffs,
//! status moves, and the review-due (actuality) query.

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
use crate::docdiff::{DiffSummary, diff_lines};
use crate::error::{ApiError, conflict};
use crate::handlers::types::{ApiResponse, ListResponse, PageQuery, authorize, field_error, not_found};
use crate::models::{document, document_version};
use crate::repositories::{DocumentRepository, OrganizationRepository};
use crate::server::AppState;

const DOC_KINDS: [&str; 5] = ["policy", "order", "regulation", "instruction", "report"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateDocumentDto {
    pub title: String,
    /// policy | order | regulation | instruction | report
    pub doc_kind: String,
    pub organization_id: Option<Uuid>,
    /// Months between mandatory reviews (default 12)
    pub review_interval_months: Option<i32>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDocumentDto {
    pub title: Option<String>,
    pub doc_kind: Option<String>,
    pub organization_id: Option<Uuid>,
    pub review_interval_months: Option<i32>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateVersionDto {
    /// Full document body for the new version
    pub body: String,
    pub change_summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentStatusDto {
    /// draft | on_approval | approved | archived
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DiffQuery {
    /// Version number on the left side of the diff
    pub from: i32,
    /// Version number on the right side of the diff
    pub to: i32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReviewDueQuery {
    /// Lookahead window in days (default 30)
    pub within_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentDto {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub title: String,
    pub doc_kind: String,
    pub status: String,
    pub current_version: i32,
    pub review_interval_months: i32,
    pub next_review_at: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionDto {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version: i32,
    pub body: String,
    pub change_summary: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

/// Version listing entry without the body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionSummaryDto {
    pub version: i32,
    pub change_summary: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

impl From<document::Model> for DocumentDto {
    fn from(model: document::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            title: model.title,
            doc_kind: model.doc_kind,
            status: model.status,
            current_version: model.current_version,
            review_interval_months: model.review_interval_months,
            next_review_at: model.next_review_at,
            owner_id: model.owner_id,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

impl From<document_version::Model> for VersionDto {
    fn from(model: document_version::Model) -> Self {
        Self {
            id: model.id,
            document_id: model.document_id,
            version: model.version,
            body: model.body,
            change_summary: model.change_summary,
            created_by: model.created_by,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<document_version::Model> for VersionSummaryDto {
    fn from(model: document_version::Model) -> Self {
        Self {
            version: model.version,
            change_summary: model.change_summary,
            created_by: model.created_by,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Allowed document status moves. Promotion to approved normally happens
/// through an approval instance; the direct move remains for tenants
/// without routes.
fn document_transition_allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("draft", "on_approval")
            | ("on_approval", "draft")
            | ("on_approval", "approved")
            | ("approved", "archived")
            | ("draft", "archived")
    )
}

/// Create a document
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    security(("bearer_auth" = [])),
    request_body = CreateDocumentDto,
    responses(
        (status = 201, description = "Document created", body = ApiResponse<DocumentDto>),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn create_document(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateDocumentDto>,
) -> Result<(StatusCode, Json<ApiResponse<DocumentDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageDocuments, "document.create").await?;

    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }
    if !DOC_KINDS.contains(&request.doc_kind.as_str()) {
        return Err(field_error("doc_kind", "Unknown document kind"));
    }
    let review_interval = request.review_interval_months.unwrap_or(12);
    if !(1..=120).contains(&review_interval) {
        return Err(field_error("review_interval_months", "Must be 1-120"));
    }
    if let Some(organization_id) = &request.organization_id
        && OrganizationRepository::new(&state.db)
            .find_by_id(&tenant.0, organization_id)
            .await?
            .is_none()
    {
        return Err(not_found("Organization"));
    }

    let now = Utc::now();
    let model = document::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        organization_id: Set(request.organization_id),
        title: Set(request.title.trim().to_string()),
        doc_kind: Set(request.doc_kind),
        status: Set("draft".to_string()),
        current_version: Set(0),
        review_interval_months: Set(review_interval),
        next_review_at: Set(None),
        owner_id: Set(request.owner_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = DocumentRepository::new(&state.db);
    let row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "document.create").target("document", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List documents with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Documents listed", body = ListResponse<DocumentDto>)
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse<DocumentDto>>, ApiError> {
    if let Some(cursor) = &page.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = DocumentRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list_by_tenant(&tenant.0, page.effective_limit(), page.cursor.clone())
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(DocumentDto::from).collect(),
        next_cursor,
    )))
}

/// Approved documents entering their review window
#[utoipa::path(
    get,
    path = "/api/v1/documents/review-due",
    security(("bearer_auth" = [])),
    params(ReviewDueQuery),
    responses(
        (status = 200, description = "Documents due for review", body = ApiResponse<Vec<DocumentDto>>)
    ),
    tag = "documents"
)]
pub async fn review_due(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<ReviewDueQuery>,
) -> Result<Json<ApiResponse<Vec<DocumentDto>>>, ApiError> {
    let within_days = query.within_days.unwrap_or(30);
    if !(0..=365).contains(&within_days) {
        return Err(field_error("within_days", "Must be 0-365"));
    }

    let repo = DocumentRepository::new(&state.db);
    let rows = repo
        .review_due(&tenant.0, Utc::now().date_naive(), within_days)
        .await?;

    Ok(Json(ApiResponse::new(
        rows.into_iter().map(DocumentDto::from).collect(),
    )))
}

/// Get one document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Document retrieved", body = ApiResponse<DocumentDto>),
        (status = 404, description = "Document not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DocumentDto>>, ApiError> {
    let repo = DocumentRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Document"))?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Update document metadata
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    request_body = UpdateDocumentDto,
    responses(
        (status = 200, description = "Document updated", body = ApiResponse<DocumentDto>),
        (status = 404, description = "Document not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn update_document(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDocumentDto>,
) -> Result<Json<ApiResponse<DocumentDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageDocuments, "document.update").await?;

    let repo = DocumentRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Document"));
    }

    if let Some(doc_kind) = &request.doc_kind
        && !DOC_KINDS.contains(&doc_kind.as_str())
    {
        return Err(field_error("doc_kind", "Unknown document kind"));
    }
    if let Some(review_interval) = request.review_interval_months
        && !(1..=120).contains(&review_interval)
    {
        return Err(field_error("review_interval_months", "Must be 1-120"));
    }

    let mut update = document::ActiveModel::default();
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(doc_kind) = request.doc_kind {
        update.doc_kind = Set(doc_kind);
    }
    if let Some(organization_id) = request.organization_id {
        update.organization_id = Set(Some(organization_id));
    }
    if let Some(review_interval_months) = request.review_interval_months {
        update.review_interval_months = Set(review_interval_months);
    }
    if let Some(owner_id) = request.owner_id {
        update.owner_id = Set(Some(owner_id));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "document.update").target("document", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a document and its versions
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageDocuments, "document.delete").await?;

    let repo = DocumentRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Document"));
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "document.delete").target("document", id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Store a new version of a document
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/versions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    request_body = CreateVersionDto,
    responses(
        (status = 201, description = "Version stored", body = ApiResponse<VersionDto>),
        (status = 404, description = "Document not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn create_version(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateVersionDto>,
) -> Result<(StatusCode, Json<ApiResponse<VersionDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageDocuments, "document.add_version")
        .await?;

    let repo = DocumentRepository::new(&state.db);
    let doc = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Document"))?;

    let (_, version) = repo
        .add_version(doc, request.body, request.change_summary, principal.actor_id())
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "document.add_version")
            .target("document", id)
            .details(serde_json::json!({ "version": version.version })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(version.into()))))
}

/// List version history (bodies omitted)
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/versions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Versions listed", body = ApiResponse<Vec<VersionSummaryDto>>),
        (status = 404, description = "Document not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn list_versions(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<VersionSummaryDto>>>, ApiError> {
    let repo = DocumentRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Document"));
    }

    let versions = repo.versions(&tenant.0, &id).await?;
    Ok(Json(ApiResponse::new(
        versions.into_iter().map(VersionSummaryDto::from).collect(),
    )))
}

/// Get one stored version with its body
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/versions/{version}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Document UUID"),
        ("version" = i32, Path, description = "Version number")
    ),
    responses(
        (status = 200, description = "Version retrieved", body = ApiResponse<VersionDto>),
        (status = 404, description = "Document or version not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn get_version(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path((id, version)): Path<(Uuid, i32)>,
) -> Result<Json<ApiResponse<VersionDto>>, ApiError> {
    let repo = DocumentRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Document"));
    }

    let row = repo
        .find_version(&tenant.0, &id, version)
        .await?
        .ok_or_else(|| not_found("Version"))?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Diff two stored versions of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/diff",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID"), DiffQuery),
    responses(
        (status = 200, description = "Diff computed", body = ApiResponse<DiffSummary>),
        (status = 400, description = "Versions too large to diff", body = ApiError),
        (status = 404, description = "Document or version not found", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn diff_versions(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<ApiResponse<DiffSummary>>, ApiError> {
    let repo = DocumentRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Document"));
    }

    let from = repo
        .find_version(&tenant.0, &id, query.from)
        .await?
        .ok_or_else(|| not_found("Version"))?;
    let to = repo
        .find_version(&tenant.0, &id, query.to)
        .await?
        .ok_or_else(|| not_found("Version"))?;

    let diff = diff_lines(&from.body, &to.body).map_err(|e| {
        crate::error::validation_error("Diff failed", serde_json::json!({ "reason": e.to_string() }))
    })?;

    Ok(Json(ApiResponse::new(diff)))
}

/// Move a document between statuses
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document UUID")),
    request_body = DocumentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<DocumentDto>),
        (status = 404, description = "Document not found", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError)
    ),
    tag = "documents"
)]
pub async fn change_status(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<DocumentStatusDto>,
) -> Result<Json<ApiResponse<DocumentDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageDocuments, "document.status").await?;

    if !["draft", "on_approval", "approved", "archived"].contains(&request.status.as_str()) {
        return Err(field_error("status", "Unknown status"));
    }

    let repo = DocumentRepository::new(&state.db);
    let doc = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Document"))?;

    if !document_transition_allowed(&doc.status, &request.status) {
        return Err(conflict(&format!(
            "Transition {} -> {} is not allowed",
            doc.status, request.status
        )));
    }
    if request.status == "on_approval" && doc.current_version == 0 {
        return Err(conflict("Document has no versions to approve"));
    }

    let from = doc.status.clone();
    let row = repo
        .set_status(doc, &request.status, Utc::now().date_naive())
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "document.status")
            .target("document", row.id)
            .details(serde_json::json!({ "from": from, "to": request.status })),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_transitions() {
        assert!(document_transition_allowed("draft", "on_approval"));
        assert!(document_transition_allowed("on_approval", "approved"));
        assert!(document_transition_allowed("on_approval", "draft"));
        assert!(document_transition_allowed("approved", "archived"));
        assert!(!document_transition_allowed("draft", "approved"));
        assert!(!document_transition_allowed("archived", "draft"));
        assert!(!document_transition_allowed("approved", "on_approval"));
    }
}
