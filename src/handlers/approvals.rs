//! # Approvals API Handlers
//!
//! Approval routes and running instances. Deciding a step requires the
//! step's role; completing the final step promotes the target, rejection
//! demotes it.

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
use crate::auth::{Permission, Principal, Role, TenantExtension};
use crate::error::{ApiError, conflict, forbidden};
use crate::handlers::types::{ApiResponse, authorize, field_error, not_found};
use crate::models::{approval_instance, approval_route};
use crate::repositories::approval::{ApprovalStep, parse_steps};
use crate::repositories::{
    ApprovalRepository, ComplianceRecordRepository, DocumentRepository,
};
use crate::server::AppState;
use crate::workflow::RecordStatus;

const TARGET_TYPES: [&str; 2] = ["document", "compliance_record"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRouteDto {
    pub name: String,
    /// Ordered role steps
    pub steps: Vec<ApprovalStep>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RouteDto {
    pub id: Uuid,
    pub name: String,
    pub steps: Vec<ApprovalStep>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartApprovalDto {
    pub route_id: Uuid,
    /// document | compliance_record
    pub target_type: String,
    pub target_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionDto {
    /// approve | reject
    pub decision: String,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InstanceQuery {
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstanceDto {
    pub id: Uuid,
    pub route_id: Uuid,
    pub target_type: String,
    pub target_id: Uuid,
    pub current_step: i32,
    pub status: String,
    pub decisions: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

impl TryFrom<approval_route::Model> for RouteDto {
    type Error = ApiError;

    fn try_from(model: approval_route::Model) -> Result<Self, Self::Error> {
        let steps = parse_steps(&model.steps).map_err(|e| {
            tracing::error!(route_id = %model.id, error = ?e, "Malformed steps on route row");
            ApiError::from(crate::error::ErrorType::InternalServerError)
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            steps,
            created_at: model.created_at.to_rfc3339(),
        })
    }
}

impl From<approval_instance::Model> for InstanceDto {
    fn from(model: approval_instance::Model) -> Self {
        Self {
            id: model.id,
            route_id: model.route_id,
            target_type: model.target_type,
            target_id: model.target_id,
            current_step: model.current_step,
            status: model.status,
            decisions: model.decisions,
            created_by: model.created_by,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

fn validate_steps(steps: &[ApprovalStep]) -> Result<(), ApiError> {
    if steps.is_empty() {
        return Err(field_error("steps", "Route must have at least one step"));
    }
    for step in steps {
        if Role::parse(&step.role).is_none() {
            return Err(field_error("steps", "Unknown role in step"));
        }
    }
    let mut positions: Vec<i32> = steps.iter().map(|s| s.position).collect();
    positions.sort_unstable();
    positions.dedup();
    if positions.len() != steps.len() {
        return Err(field_error("steps", "Step positions must be unique"));
    }
    Ok(())
}

/// Create an approval route
#[utoipa::path(
    post,
    path = "/api/v1/approval-routes",
    security(("bearer_auth" = [])),
    request_body = CreateRouteDto,
    responses(
        (status = 201, description = "Route created", body = ApiResponse<RouteDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Name already in use", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn create_route(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateRouteDto>,
) -> Result<(StatusCode, Json<ApiResponse<RouteDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageApprovals, "approval_route.create")
        .await?;

    if request.name.trim().is_empty() {
        return Err(field_error("name", "Must not be empty"));
    }
    validate_steps(&request.steps)?;

    let now = Utc::now();
    let model = approval_route::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        name: Set(request.name.trim().to_string()),
        steps: Set(serde_json::json!(request.steps)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = ApprovalRepository::new(&state.db);
    let row = repo.create_route(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "approval_route.create")
            .target("approval_route", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.try_into()?))))
}

/// List approval routes
#[utoipa::path(
    get,
    path = "/api/v1/approval-routes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Routes listed", body = ApiResponse<Vec<RouteDto>>)
    ),
    tag = "approvals"
)]
pub async fn list_routes(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<Vec<RouteDto>>>, ApiError> {
    let repo = ApprovalRepository::new(&state.db);
    let routes = repo.list_routes(&tenant.0).await?;

    let mut dtos = Vec::with_capacity(routes.len());
    for route in routes {
        dtos.push(RouteDto::try_from(route)?);
    }

    Ok(Json(ApiResponse::new(dtos)))
}

/// Delete an approval route
#[utoipa::path(
    delete,
    path = "/api/v1/approval-routes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Route UUID")),
    responses(
        (status = 204, description = "Route deleted"),
        (status = 404, description = "Route not found", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn delete_route(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageApprovals, "approval_route.delete")
        .await?;

    let repo = ApprovalRepository::new(&state.db);
    if !repo.delete_route(&tenant.0, &id).await? {
        return Err(not_found("Route"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_target(
    state: &AppState,
    tenant: &crate::auth::TenantId,
    target_type: &str,
    target_id: &Uuid,
) -> Result<(), ApiError> {
    match target_type {
        "document" => {
            let doc = DocumentRepository::new(&state.db)
                .find_by_id(&tenant.0, target_id)
                .await?
                .ok_or_else(|| not_found("Document"))?;
            if doc.status != "on_approval" {
                return Err(conflict("Document is not on approval"));
            }
        }
        "compliance_record" => {
            let row = ComplianceRecordRepository::new(&state.db)
                .find_by_id(&tenant.0, target_id)
                .await?
                .ok_or_else(|| not_found("Compliance record"))?;
            if row.status != RecordStatus::PendingReview.as_str() {
                return Err(conflict("Compliance record is not pending review"));
            }
        }
        _ => {
            return Err(field_error(
                "target_type",
                "Must be document or compliance_record",
            ));
        }
    }
    Ok(())
}

/// Start an approval instance for a target
#[utoipa::path(
    post,
    path = "/api/v1/approvals",
    security(("bearer_auth" = [])),
    request_body = StartApprovalDto,
    responses(
        (status = 201, description = "Instance started", body = ApiResponse<InstanceDto>),
        (status = 404, description = "Route or target not found", body = ApiError),
        (status = 409, description = "Target already has a pending instance", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn start_approval(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<StartApprovalDto>,
) -> Result<(StatusCode, Json<ApiResponse<InstanceDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::DecideApprovals, "approval.start").await?;

    if !TARGET_TYPES.contains(&request.target_type.as_str()) {
        return Err(field_error("target_type", "Must be document or compliance_record"));
    }

    let repo = ApprovalRepository::new(&state.db);
    let route = repo
        .find_route(&tenant.0, &request.route_id)
        .await?
        .ok_or_else(|| not_found("Route"))?;

    ensure_target(&state, &tenant, &request.target_type, &request.target_id).await?;

    if repo
        .pending_instance_for_target(&tenant.0, &request.target_type, &request.target_id)
        .await?
        .is_some()
    {
        return Err(conflict("Target already has a pending approval instance"));
    }

    let now = Utc::now();
    let model = approval_instance::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        route_id: Set(route.id),
        target_type: Set(request.target_type.clone()),
        target_id: Set(request.target_id),
        current_step: Set(0),
        status: Set("pending".to_string()),
        decisions: Set(serde_json::json!([])),
        created_by: Set(principal.actor_id()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let instance = repo.create_instance(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "approval.start")
            .target("approval_instance", instance.id)
            .details(serde_json::json!({
                "target_type": request.target_type,
                "target_id": request.target_id,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(instance.into()))))
}

/// Get one approval instance
#[utoipa::path(
    get,
    path = "/api/v1/approvals/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance UUID")),
    responses(
        (status = 200, description = "Instance retrieved", body = ApiResponse<InstanceDto>),
        (status = 404, description = "Instance not found", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn get_approval(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    let repo = ApprovalRepository::new(&state.db);
    let instance = repo
        .find_instance(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Approval instance"))?;

    Ok(Json(ApiResponse::new(instance.into())))
}

/// List instances for a target
#[utoipa::path(
    get,
    path = "/api/v1/approvals",
    security(("bearer_auth" = [])),
    params(InstanceQuery),
    responses(
        (status = 200, description = "Instances listed", body = ApiResponse<Vec<InstanceDto>>),
        (status = 400, description = "Missing target filter", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn list_approvals(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<InstanceQuery>,
) -> Result<Json<ApiResponse<Vec<InstanceDto>>>, ApiError> {
    let (Some(target_type), Some(target_id)) = (query.target_type, query.target_id) else {
        return Err(field_error("target_type", "target_type and target_id are required"));
    };

    let repo = ApprovalRepository::new(&state.db);
    let instances = repo
        .list_instances_for_target(&tenant.0, &target_type, &target_id)
        .await?;

    Ok(Json(ApiResponse::new(
        instances.into_iter().map(InstanceDto::from).collect(),
    )))
}

/// Decide the current step of a pending instance
///
/// Approving the final step completes the instance and promotes the
/// target; rejecting terminates it and demotes the target.
#[utoipa::path(
    post,
    path = "/api/v1/approvals/{id}/decision",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance UUID")),
    request_body = DecisionDto,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<InstanceDto>),
        (status = 403, description = "Role does not match the step", body = ApiError),
        (status = 404, description = "Instance not found", body = ApiError),
        (status = 409, description = "Instance is not pending", body = ApiError)
    ),
    tag = "approvals"
)]
pub async fn decide(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionDto>,
) -> Result<Json<ApiResponse<InstanceDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::DecideApprovals, "approval.decide").await?;

    let approve = match request.decision.as_str() {
        "approve" => true,
        "reject" => false,
        _ => return Err(field_error("decision", "Must be approve or reject")),
    };

    let repo = ApprovalRepository::new(&state.db);
    let instance = repo
        .find_instance(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Approval instance"))?;

    if instance.status != "pending" {
        return Err(conflict("Approval instance is not pending"));
    }

    let route = repo
        .find_route(&tenant.0, &instance.route_id)
        .await?
        .ok_or_else(|| not_found("Route"))?;
    let steps = parse_steps(&route.steps).map_err(|e| {
        tracing::error!(route_id = %route.id, error = ?e, "Malformed steps on route row");
        ApiError::from(crate::error::ErrorType::InternalServerError)
    })?;

    let step = steps
        .get(instance.current_step as usize)
        .ok_or_else(|| conflict("Instance step is out of range"))?;
    let step_role = Role::parse(&step.role)
        .ok_or_else(|| ApiError::from(crate::error::ErrorType::InternalServerError))?;

    if !principal.matches_step_role(step_role) {
        return Err(forbidden(Some("Current step requires a different role")));
    }

    let mut decisions = instance.decisions.as_array().cloned().unwrap_or_default();
    decisions.push(serde_json::json!({
        "step": instance.current_step,
        "user_id": principal.actor_id(),
        "decision": request.decision,
        "comment": request.comment,
        "at": Utc::now().to_rfc3339(),
    }));

    let is_final = (instance.current_step as usize) + 1 >= steps.len();
    let (next_step, new_status) = if !approve {
        (instance.current_step, "rejected")
    } else if is_final {
        (instance.current_step, "approved")
    } else {
        (instance.current_step + 1, "pending")
    };

    let target_type = instance.target_type.clone();
    let target_id = instance.target_id;

    let updated = repo
        .save_instance(instance, next_step, new_status, serde_json::json!(decisions))
        .await?;

    // Promote or demote the target once the walk terminates.
    if new_status != "pending" {
        apply_outcome(&state, &tenant, &principal, &target_type, &target_id, approve).await?;
    }

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "approval.decide")
            .target("approval_instance", updated.id)
            .details(serde_json::json!({
                "decision": request.decision,
                "status": new_status,
            })),
    )
    .await;

    Ok(Json(ApiResponse::new(updated.into())))
}

async fn apply_outcome(
    state: &AppState,
    tenant: &crate::auth::TenantId,
    principal: &Principal,
    target_type: &str,
    target_id: &Uuid,
    approved: bool,
) -> Result<(), ApiError> {
    match target_type {
        "document" => {
            let repo = DocumentRepository::new(&state.db);
            if let Some(doc) = repo.find_by_id(&tenant.0, target_id).await? {
                let status = if approved { "approved" } else { "draft" };
                repo.set_status(doc, status, Utc::now().date_naive()).await?;
            }
        }
        "compliance_record" => {
            let repo = ComplianceRecordRepository::new(&state.db);
            if let Some(row) = repo.find_by_id(&tenant.0, target_id).await? {
                let status = if approved {
                    RecordStatus::Approved
                } else {
                    RecordStatus::Rejected
                };
                repo.set_status(row, status, principal.actor_id()).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(position: i32, role: &str) -> ApprovalStep {
        ApprovalStep {
            position,
            role: role.to_string(),
        }
    }

    #[test]
    fn steps_validation() {
        assert!(validate_steps(&[step(0, "compliance_officer"), step(1, "admin")]).is_ok());
        assert!(validate_steps(&[]).is_err());
        assert!(validate_steps(&[step(0, "manager")]).is_err());
        assert!(validate_steps(&[step(0, "admin"), step(0, "auditor")]).is_err());
    }
}
