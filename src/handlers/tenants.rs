//! # Tenants API Handlers
//!
//! Tenant creation and management; operator tokens only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Principal, require_operator};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, not_found};
use crate::models::tenant;
use crate::repositories::{CreateTenantRequest, TenantRepository};
use crate::server::AppState;

/// Request payload for creating a new tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTenantDto {
    /// Display name for the tenant (required, max 255 characters)
    #[schema(example = "Acme Corp")]
    pub name: String,
}

/// Tenant representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantDto {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

impl From<tenant::Model> for TenantDto {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Create a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    security(("bearer_auth" = [])),
    request_body = CreateTenantDto,
    responses(
        (status = 201, description = "Tenant created", body = ApiResponse<TenantDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Operator token required", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateTenantDto>,
) -> Result<(StatusCode, Json<ApiResponse<TenantDto>>), ApiError> {
    require_operator(&principal)?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(crate::error::validation_error(
            "Tenant name is required and cannot be empty",
            serde_json::json!({ "name": "Tenant name must be provided" }),
        ));
    }
    if name.len() > 255 {
        return Err(crate::error::validation_error(
            "Tenant name exceeds maximum length",
            serde_json::json!({ "name": "Tenant name cannot exceed 255 characters" }),
        ));
    }

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .create_tenant(CreateTenantRequest {
            name: name.to_string(),
        })
        .await?;

    tracing::info!(tenant_id = %tenant.id, "Tenant created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(tenant.into()))))
}

/// Get a tenant by ID
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant UUID")),
    responses(
        (status = 200, description = "Tenant retrieved", body = ApiResponse<TenantDto>),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TenantDto>>, ApiError> {
    require_operator(&principal)?;

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .get_tenant_by_id(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant"))?;

    Ok(Json(ApiResponse::new(tenant.into())))
}

/// List all tenants
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tenants listed", body = ApiResponse<Vec<TenantDto>>),
        (status = 403, description = "Operator token required", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<Vec<TenantDto>>>, ApiError> {
    require_operator(&principal)?;

    let repo = TenantRepository::new(&state.db);
    let tenants = repo.list_all().await?;

    Ok(Json(ApiResponse::new(
        tenants.into_iter().map(TenantDto::from).collect(),
    )))
}
