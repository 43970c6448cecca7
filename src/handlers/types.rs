//! Shared handler types: response envelopes, pagination query parameters
//! and the authorize-with-audit helper.

use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditResult, record};
use crate::auth::{Permission, Principal, TenantId};
use crate::error::ApiError;
use crate::server::AppState;
use crate::telemetry;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response metadata
    pub meta: ResponseMeta,
}

/// Paginated API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Page of items
    pub data: Vec<T>,
    /// Cursor for the next page; absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Response metadata
    pub meta: ResponseMeta,
}

/// Response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    /// Request identifier for tracing
    pub request_id: String,
    /// Response timestamp (ISO 8601)
    pub timestamp: String,
}

impl ResponseMeta {
    pub fn now() -> Self {
        Self {
            request_id: telemetry::current_trace_id()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::now(),
        }
    }
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            data,
            next_cursor,
            meta: ResponseMeta::now(),
        }
    }
}

/// Cursor pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page size (1-200, default 50)
    pub limit: Option<u64>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
}

impl PageQuery {
    /// Effective page size, clamped to 1..=200.
    pub fn effective_limit(&self) -> u64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

/// Check a permission, audit-logging denials before returning 403.
pub async fn authorize(
    state: &AppState,
    tenant: TenantId,
    principal: &Principal,
    permission: Permission,
    action: &str,
) -> Result<(), ApiError> {
    if let Err(err) = principal.require(permission) {
        record(
            &state.db,
            AuditEntry::new(tenant, principal, action).result(AuditResult::Denied),
        )
        .await;
        return Err(err);
    }
    Ok(())
}

/// Map a validation failure to a 400 with field details.
pub fn field_error(field: &str, message: &str) -> ApiError {
    crate::error::validation_error(
        "Validation failed",
        serde_json::json!({ field: message }),
    )
}

/// 404 helper keeping cross-tenant probes indistinguishable from missing
/// rows.
pub fn not_found(resource: &str) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "NOT_FOUND".to_string(),
        format!("{} not found", resource),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_limit_defaults_and_clamps() {
        assert_eq!(PageQuery::default().effective_limit(), 50);
        assert_eq!(
            PageQuery {
                limit: Some(0),
                cursor: None
            }
            .effective_limit(),
            1
        );
        assert_eq!(
            PageQuery {
                limit: Some(10_000),
                cursor: None
            }
            .effective_limit(),
            200
        );
    }

    #[test]
    fn field_error_carries_details() {
        let err = field_error("inn", "Must be 10 or 12 digits");
        assert_eq!(err.code, "VALIDATION_FAILED".into());
        assert!(err.details.is_some());
    }
}
