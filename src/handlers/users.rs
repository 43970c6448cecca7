//! # Users API Handlers
//!
//! Tenant user management. Creating a user mints a bearer token whose
//! plaintext is returned exactly once; only the SHA-256 digest is stored.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, Role, TenantExtension, hash_token};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, authorize, field_error, not_found};
use crate::models::user;
use crate::repositories::UserRepository;
use crate::repositories::user::CreateUserParams;
use crate::server::AppState;

/// Request payload for creating a user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserDto {
    #[schema(example = "officer@example.com")]
    pub email: String,
    pub display_name: Option<String>,
    /// admin | compliance_officer | auditor | viewer
    #[schema(example = "compliance_officer")]
    pub role: String,
}

/// Request payload for updating a user
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserDto {
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// User representation returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Creation response carrying the one-time plaintext token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedUserDto {
    #[serde(flatten)]
    pub user: UserDto,
    /// Bearer token; shown only in this response
    pub token: String,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') || email.len() > 320 {
        return Err(field_error("email", "Must be a valid email address"));
    }
    Ok(())
}

/// Create a user and mint their bearer token
#[utoipa::path(
    post,
    path = "/api/v1/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = ApiResponse<CreatedUserDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateUserDto>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedUserDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageUsers, "user.create").await?;

    validate_email(&request.email)?;
    if Role::parse(&request.role).is_none() {
        return Err(field_error(
            "role",
            "Must be one of admin, compliance_officer, auditor, viewer",
        ));
    }

    let token = format!("cmp_{}", Uuid::new_v4().simple());

    let repo = UserRepository::new(&state.db);
    let user = repo
        .create(CreateUserParams {
            tenant_id: tenant.0,
            email: request.email.trim().to_lowercase(),
            display_name: request.display_name,
            role: request.role,
            token_sha256: hash_token(&token),
        })
        .await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "user.create").target("user", user.id),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CreatedUserDto {
            user: user.into(),
            token,
        })),
    ))
}

/// List users of the tenant
#[utoipa::path(
    get,
    path = "/api/v1/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users listed", body = ApiResponse<Vec<UserDto>>)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let users = repo.list_by_tenant(&tenant.0).await?;

    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User retrieved", body = ApiResponse<UserDto>),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let repo = UserRepository::new(&state.db);
    let user = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("User"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// Update a user's role, name or active flag
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserDto>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageUsers, "user.update").await?;

    if let Some(role) = &request.role
        && Role::parse(role).is_none()
    {
        return Err(field_error(
            "role",
            "Must be one of admin, compliance_officer, auditor, viewer",
        ));
    }

    let repo = UserRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("User"));
    }

    let mut update = user::ActiveModel::default();
    if let Some(display_name) = request.display_name {
        update.display_name = Set(Some(display_name));
    }
    if let Some(role) = request.role {
        update.role = Set(role);
    }
    if let Some(is_active) = request.is_active {
        update.is_active = Set(is_active);
    }

    let user = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "user.update").target("user", user.id),
    )
    .await;

    Ok(Json(ApiResponse::new(user.into())))
}
