//! # Cron API Handlers
//!
//! Operator-triggered entry point for the notification sweep. Runs the
//! same code path as the background scheduler, so external cron can drive
//! deployments that disable the in-process loop.

use axum::{extract::State, response::Json};

use crate::auth::{Principal, require_operator};
use crate::error::ApiError;
use crate::handlers::types::ApiResponse;
use crate::notifier::{self, SweepStats};
use crate::server::AppState;

/// Run the notification sweep across all tenants
#[utoipa::path(
    post,
    path = "/api/v1/cron/notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = ApiResponse<SweepStats>),
        (status = 403, description = "Operator token required", body = ApiError)
    ),
    tag = "cron"
)]
pub async fn run_notification_sweep(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<SweepStats>>, ApiError> {
    require_operator(&principal)?;

    let stats = notifier::run_sweep(&state.db, chrono::Utc::now())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::new(stats)))
}
