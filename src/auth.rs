//! # Authentication and Authorization
//!
//! This module provides bearer authentication and role-based permission
//! checks for protected API endpoints.
//!
//! Two kinds of principals exist: operator tokens from configuration, which
//! act on any tenant named by the `X-Tenant-Id` header, and user tokens,
//! which resolve through a SHA-256 hash lookup to a tenant-scoped user row.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{ApiError, forbidden, unauthorized, validation_error};
use crate::models::user::{self, Entity as User};
use crate::server::AppState;

/// Tenant ID wrapper for type safety
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantId(pub Uuid);

/// Extractor for tenant ID from request extensions
#[derive(Debug, Clone, Copy)]
pub struct TenantExtension(pub TenantId);

/// Role assigned to a user within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ComplianceOfficer,
    Auditor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ComplianceOfficer => "compliance_officer",
            Role::Auditor => "auditor",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "compliance_officer" => Some(Role::ComplianceOfficer),
            "auditor" => Some(Role::Auditor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Static role→permission table gating mutating endpoints.
    ///
    /// Auditors and viewers are read-only, except that auditors may pull
    /// register exports.
    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::ComplianceOfficer => !matches!(permission, ManageUsers),
            Role::Auditor => matches!(permission, ExportRegister),
            Role::Viewer => false,
        }
    }
}

/// Mutating capabilities gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageUsers,
    ManageOrganizations,
    ManageRequirements,
    ManageApplicability,
    ManageCompliance,
    ManageControls,
    ManageEvidence,
    ManageRisks,
    ManageDocuments,
    ManageApprovals,
    DecideApprovals,
    ManageNotifications,
    ManageProjects,
    LogTime,
    ExportRegister,
}

/// Authenticated user resolved from a bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

/// Authenticated principal attached to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// Operator token from configuration; acts with full permissions
    Operator,
    User(CurrentUser),
}

impl Principal {
    /// Check a permission, returning 403 on denial.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        match self {
            Principal::Operator => Ok(()),
            Principal::User(user) if user.role.allows(permission) => Ok(()),
            Principal::User(_) => Err(forbidden(None)),
        }
    }

    /// Actor user ID for audit records; NULL for operator requests.
    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            Principal::Operator => None,
            Principal::User(user) => Some(user.id),
        }
    }

    pub fn role_str(&self) -> &'static str {
        match self {
            Principal::Operator => "operator",
            Principal::User(user) => user.role.as_str(),
        }
    }

    /// Whether this principal can decide an approval step requiring `role`.
    pub fn matches_step_role(&self, role: Role) -> bool {
        match self {
            Principal::Operator => true,
            Principal::User(user) => user.role == role || user.role == Role::Admin,
        }
    }
}

/// SHA-256 hex digest of a bearer token, as stored in the users table.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication middleware that resolves bearer tokens to a principal and
/// a tenant scope.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();
    let token = extract_bearer_token(&headers)?;

    let (principal, tenant) = if is_operator_token(&state, token) {
        // Operators name the tenant they act on; tenant-management
        // endpoints work without one.
        (Principal::Operator, optional_tenant_header(&headers)?)
    } else {
        let user = lookup_user(&state, token).await?;
        // A tenant header on a user request must agree with the user's own
        // tenant; anything else is a scoping error, not a switch.
        if let Some(requested) = optional_tenant_header(&headers)?
            && requested.0 != user.tenant_id
        {
            return Err(forbidden(Some("Tenant scope mismatch")));
        }
        let tenant = TenantId(user.tenant_id);
        (Principal::User(user), Some(tenant))
    };

    tracing::debug!(
        tenant_id = ?tenant.map(|t| t.0),
        role = principal.role_str(),
        "Authenticated request"
    );

    let mut request = request;
    if let Some(tenant) = tenant {
        request.extensions_mut().insert(TenantExtension(tenant));
    }
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Reject non-operator principals (tenant management, cron surfaces).
pub fn require_operator(principal: &Principal) -> Result<(), ApiError> {
    match principal {
        Principal::Operator => Ok(()),
        Principal::User(_) => Err(forbidden(Some("Operator token required"))),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

fn is_operator_token(state: &AppState, token: &str) -> bool {
    state
        .config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into())
}

async fn lookup_user(state: &AppState, token: &str) -> Result<CurrentUser, ApiError> {
    let digest = hash_token(token);

    let user = User::find()
        .filter(user::Column::TokenSha256.eq(digest))
        .one(&state.db)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid bearer token")))?;

    if !user.is_active {
        return Err(unauthorized(Some("User is deactivated")));
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        tracing::error!(user_id = %user.id, role = %user.role, "Unknown role on user row");
        unauthorized(Some("Invalid bearer token"))
    })?;

    Ok(CurrentUser {
        id: user.id,
        tenant_id: user.tenant_id,
        role,
    })
}

fn optional_tenant_header(headers: &HeaderMap) -> Result<Option<TenantId>, ApiError> {
    let Some(value) = headers.get("X-Tenant-Id") else {
        return Ok(None);
    };

    let header_value = value.to_str().map_err(|_| {
        validation_error(
            "Invalid tenant header",
            serde_json::json!({ "X-Tenant-Id": "Header must be valid UTF-8" }),
        )
    })?;

    header_value
        .parse::<Uuid>()
        .map(TenantId)
        .map(Some)
        .map_err(|_| {
            validation_error(
                "Invalid tenant ID",
                serde_json::json!({ "X-Tenant-Id": "Must be a valid UUID" }),
            )
        })
}

/// OpenAPI header parameter for X-Tenant-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct TenantHeader {
    /// Tenant identifier (UUID) that scopes the request to a specific tenant
    #[serde(rename = "X-Tenant-Id")]
    #[param(rename = "X-Tenant-Id", value_type = String)]
    pub tenant_id: String,
}

impl<S> FromRequestParts<S> for TenantExtension
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantExtension>()
            .copied()
            .ok_or_else(|| {
                validation_error(
                    "Tenant context missing",
                    serde_json::json!({ "X-Tenant-Id": "Tenant context not present" }),
                )
            })
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips() {
        for role in [
            Role::Admin,
            Role::ComplianceOfficer,
            Role::Auditor,
            Role::Viewer,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn admin_allows_everything() {
        assert!(Role::Admin.allows(Permission::ManageUsers));
        assert!(Role::Admin.allows(Permission::ManageOrganizations));
        assert!(Role::Admin.allows(Permission::ExportRegister));
    }

    #[test]
    fn compliance_officer_cannot_manage_users() {
        assert!(!Role::ComplianceOfficer.allows(Permission::ManageUsers));
        assert!(Role::ComplianceOfficer.allows(Permission::ManageCompliance));
        assert!(Role::ComplianceOfficer.allows(Permission::DecideApprovals));
    }

    #[test]
    fn auditor_is_read_only_except_export() {
        assert!(Role::Auditor.allows(Permission::ExportRegister));
        assert!(!Role::Auditor.allows(Permission::ManageRisks));
        assert!(!Role::Auditor.allows(Permission::LogTime));
    }

    #[test]
    fn viewer_has_no_mutating_permissions() {
        assert!(!Role::Viewer.allows(Permission::ExportRegister));
        assert!(!Role::Viewer.allows(Permission::ManageOrganizations));
    }

    #[test]
    fn operator_principal_passes_all_checks() {
        assert!(Principal::Operator.require(Permission::ManageUsers).is_ok());
        assert_eq!(Principal::Operator.actor_id(), None);
        assert_eq!(Principal::Operator.role_str(), "operator");
    }

    #[test]
    fn user_principal_enforces_role() {
        let viewer = Principal::User(CurrentUser {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: Role::Viewer,
        });
        let err = viewer.require(Permission::ManageRisks).unwrap_err();
        assert_eq!(err.code, "FORBIDDEN".into());
    }

    #[test]
    fn step_role_matching() {
        let officer = Principal::User(CurrentUser {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: Role::ComplianceOfficer,
        });
        assert!(officer.matches_step_role(Role::ComplianceOfficer));
        assert!(!officer.matches_step_role(Role::Auditor));

        let admin = Principal::User(CurrentUser {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: Role::Admin,
        });
        assert!(admin.matches_step_role(Role::Auditor));
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let digest = hash_token("token-123");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("token-123"));
        assert_ne!(digest, hash_token("token-124"));
    }
}
