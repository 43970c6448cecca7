//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Compliance
//! API.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod applicability;
pub mod approvals;
pub mod audit_events;
pub mod compliance;
pub mod controls;
pub mod cron;
pub mod dashboard;
pub mod documents;
pub mod evidence;
pub mod exports;
pub mod notifications;
pub mod organizations;
pub mod projects;
pub mod requirements;
pub mod risks;
pub mod tenants;
pub mod types;
pub mod users;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe verifying database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unavailable", body = crate::error::ApiError)
    ),
    tag = "root"
)]
pub async fn health(
    axum::extract::State(state): axum::extract::State<crate::server::AppState>,
) -> Result<Json<serde_json::Value>, crate::error::ApiError> {
    crate::db::health_check(&state.db).await.map_err(|err| {
        tracing::error!(error = ?err, "Health check failed");
        crate::error::ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unavailable",
        )
    })?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
