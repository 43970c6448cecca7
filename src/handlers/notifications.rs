//! # Notifications API Handlers
//!
//! Rule CRUD and the in-app delivery surface (list + dismiss).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, ListResponse, authorize, field_error, not_found};
use crate::models::{notification, notification_rule};
use crate::notifier::EventKind;
use crate::repositories::NotificationRepository;
use crate::server::AppState;

const CHANNELS: [&str; 3] = ["in_app", "email", "webhook"];
const NOTIFICATION_STATUSES: [&str; 3] = ["pending", "sent", "dismissed"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRuleDto {
    pub name: String,
    /// compliance_due | document_review_due | measure_due | evidence_expiring
    pub event_kind: String,
    /// Lookahead window in days; falls back to the configured default
    pub days_before: Option<i32>,
    /// in_app | email | webhook (only in_app is delivered)
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_channel() -> String {
    "in_app".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRuleDto {
    pub name: Option<String>,
    pub event_kind: Option<String>,
    pub days_before: Option<i32>,
    pub channel: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RuleDto {
    pub id: Uuid,
    pub name: String,
    pub event_kind: String,
    pub days_before: i32,
    pub channel: String,
    pub enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// pending | sent | dismissed
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationDto {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub target_type: String,
    pub target_id: Uuid,
    pub message: String,
    pub due_at: String,
    pub status: String,
    pub created_at: String,
}

impl From<notification_rule::Model> for RuleDto {
    fn from(model: notification_rule::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            event_kind: model.event_kind,
            days_before: model.days_before,
            channel: model.channel,
            enabled: model.enabled,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<notification::Model> for NotificationDto {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            rule_id: model.rule_id,
            target_type: model.target_type,
            target_id: model.target_id,
            message: model.message,
            due_at: model.due_at.to_rfc3339(),
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn validate_days_before(days: i32) -> Result<(), ApiError> {
    if !(1..=365).contains(&days) {
        return Err(field_error("days_before", "Must be 1-365"));
    }
    Ok(())
}

/// Create a notification rule
#[utoipa::path(
    post,
    path = "/api/v1/notification-rules",
    security(("bearer_auth" = [])),
    request_body = CreateRuleDto,
    responses(
        (status = 201, description = "Rule created", body = ApiResponse<RuleDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Name already in use", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn create_rule(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateRuleDto>,
) -> Result<(StatusCode, Json<ApiResponse<RuleDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageNotifications, "notification_rule.create")
        .await?;

    if request.name.trim().is_empty() {
        return Err(field_error("name", "Must not be empty"));
    }
    if EventKind::parse(&request.event_kind).is_none() {
        return Err(field_error("event_kind", "Unknown event kind"));
    }
    if !CHANNELS.contains(&request.channel.as_str()) {
        return Err(field_error("channel", "Must be in_app, email or webhook"));
    }

    let days_before = request
        .days_before
        .unwrap_or(state.config.notifications.default_days_before as i32);
    validate_days_before(days_before)?;

    let now = Utc::now();
    let model = notification_rule::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        name: Set(request.name.trim().to_string()),
        event_kind: Set(request.event_kind),
        days_before: Set(days_before),
        channel: Set(request.channel),
        enabled: Set(request.enabled),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = NotificationRepository::new(&state.db);
    let row = repo.create_rule(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "notification_rule.create")
            .target("notification_rule", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List notification rules
#[utoipa::path(
    get,
    path = "/api/v1/notification-rules",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rules listed", body = ApiResponse<Vec<RuleDto>>)
    ),
    tag = "notifications"
)]
pub async fn list_rules(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<Vec<RuleDto>>>, ApiError> {
    let repo = NotificationRepository::new(&state.db);
    let rules = repo.list_rules(&tenant.0).await?;

    Ok(Json(ApiResponse::new(
        rules.into_iter().map(RuleDto::from).collect(),
    )))
}

/// Update a notification rule
#[utoipa::path(
    patch,
    path = "/api/v1/notification-rules/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rule UUID")),
    request_body = UpdateRuleDto,
    responses(
        (status = 200, description = "Rule updated", body = ApiResponse<RuleDto>),
        (status = 404, description = "Rule not found", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn update_rule(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRuleDto>,
) -> Result<Json<ApiResponse<RuleDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageNotifications, "notification_rule.update")
        .await?;

    let repo = NotificationRepository::new(&state.db);
    if repo.find_rule(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Rule"));
    }

    if let Some(event_kind) = &request.event_kind
        && EventKind::parse(event_kind).is_none()
    {
        return Err(field_error("event_kind", "Unknown event kind"));
    }
    if let Some(channel) = &request.channel
        && !CHANNELS.contains(&channel.as_str())
    {
        return Err(field_error("channel", "Must be in_app, email or webhook"));
    }
    if let Some(days_before) = request.days_before {
        validate_days_before(days_before)?;
    }

    let mut update = notification_rule::ActiveModel::default();
    if let Some(name) = request.name {
        update.name = Set(name);
    }
    if let Some(event_kind) = request.event_kind {
        update.event_kind = Set(event_kind);
    }
    if let Some(days_before) = request.days_before {
        update.days_before = Set(days_before);
    }
    if let Some(channel) = request.channel {
        update.channel = Set(channel);
    }
    if let Some(enabled) = request.enabled {
        update.enabled = Set(enabled);
    }

    let row = repo.update_rule(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "notification_rule.update")
            .target("notification_rule", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a notification rule
#[utoipa::path(
    delete,
    path = "/api/v1/notification-rules/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rule UUID")),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn delete_rule(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageNotifications, "notification_rule.delete")
        .await?;

    let repo = NotificationRepository::new(&state.db);
    if !repo.delete_rule(&tenant.0, &id).await? {
        return Err(not_found("Rule"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// List notifications
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications listed", body = ListResponse<NotificationDto>)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ListResponse<NotificationDto>>, ApiError> {
    if let Some(status) = &query.status
        && !NOTIFICATION_STATUSES.contains(&status.as_str())
    {
        return Err(field_error("status", "Must be pending, sent or dismissed"));
    }

    if let Some(cursor) = &query.cursor {
        crate::cursor::decode_cursor(cursor)?;
    }

    let repo = NotificationRepository::new(&state.db);
    let (rows, next_cursor) = repo
        .list(
            &tenant.0,
            query.status.as_deref(),
            query.limit.unwrap_or(50).clamp(1, 200),
            query.cursor.clone(),
        )
        .await?;

    Ok(Json(ListResponse::new(
        rows.into_iter().map(NotificationDto::from).collect(),
        next_cursor,
    )))
}

/// Dismiss a notification
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/dismiss",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification UUID")),
    responses(
        (status = 200, description = "Notification dismissed", body = ApiResponse<NotificationDto>),
        (status = 404, description = "Notification not found", body = ApiError)
    ),
    tag = "notifications"
)]
pub async fn dismiss_notification(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NotificationDto>>, ApiError> {
    let repo = NotificationRepository::new(&state.db);
    let row = repo
        .dismiss(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Notification"))?;

    Ok(Json(ApiResponse::new(row.into())))
}
