//! # Audit Trail API Handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::ListResponse;
use crate::models::audit_event;
use crate::repositories::AuditEventRepository;
use crate::repositories::audit_event::AuditFilter;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Action slug filter, e.g. "organization.create"
    pub action: Option<String>,
    pub target_type: Option<String>,
    /// success | denied | error
    pub result: Option<String>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEventDto {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub result: String,
    pub details: Option<serde_json::Value>,
    pub trace_id: Option<String>,
    pub occurred_at: String,
}

impl From<audit_event::Model> for AuditEventDto {
    fn from(model: audit_event::Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            actor_role: model.actor_role,
            action: model.action,
            target_type: model.target_type,
            target_id: model.target_id,
            result: model.result,
            details: model.details,
            trace_id: model.trace_id,
            occurred_at: model.occurred_at.to_rfc3339(),
        }
    }
}

/// List audit events
#[utoipa::path(
    get,
    path = "/api/v1/audit-events",
    security(("bearer_auth" = [])),
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit events listed", body = ListResponse<AuditEventDto>)
    ),
    tag = "audit"
)]
pub async fn list_audit_events(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ListResponse<AuditEventDto>>, ApiError> {
    let filter = AuditFilter {
        action: query.action,
        target_type: query.target_type,
        result: query.result,
    };

    if let Some(cursor) = &query.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = AuditEventRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list(
            &tenant.0,
            &filter,
            query.limit.unwrap_or(50).clamp(1, 200),
            query.cursor.clone(),
        )
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(AuditEventDto::from).collect(),
        next_cursor,
    )))
}
