//! # Projects API Handlers
//!
//! The project-management/time-tracking module: projects, tasks and time
//! entries with a per-project summary.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::{ApiResponse, authorize, field_error, not_found};
use crate::models::{project, project_task, time_entry};
use crate::repositories::ProjectRepository;
use crate::server::AppState;

const PROJECT_STATUSES: [&str; 4] = ["active", "on_hold", "completed", "archived"];
const TASK_STATUSES: [&str; 4] = ["todo", "in_progress", "done", "cancelled"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateProjectDto {
    pub name: String,
    pub description: Option<String>,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProjectDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub lead_id: Option<Uuid>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTaskDto {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTaskDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTimeEntryDto {
    pub spent_on: NaiveDate,
    /// Minutes logged (1-1440)
    pub minutes: i32,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimeEntryDto {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub spent_on: NaiveDate,
    pub minutes: i32,
    pub note: Option<String>,
}

/// Aggregated time for one project
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimeSummaryDto {
    pub total_minutes: i64,
    pub by_user: Vec<UserMinutesDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserMinutesDto {
    pub user_id: Uuid,
    pub minutes: i64,
}

impl From<project::Model> for ProjectDto {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            status: model.status,
            lead_id: model.lead_id,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<project_task::Model> for TaskDto {
    fn from(model: project_task::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            title: model.title,
            description: model.description,
            status: model.status,
            assignee_id: model.assignee_id,
            due_date: model.due_date,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

impl From<time_entry::Model> for TimeEntryDto {
    fn from(model: time_entry::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            user_id: model.user_id,
            spent_on: model.spent_on,
            minutes: model.minutes,
            note: model.note,
        }
    }
}

/// Create a project
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    security(("bearer_auth" = [])),
    request_body = CreateProjectDto,
    responses(
        (status = 201, description = "Project created", body = ApiResponse<ProjectDto>),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Json(request): Json<CreateProjectDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProjectDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "project.create").await?;

    if request.name.trim().is_empty() {
        return Err(field_error("name", "Must not be empty"));
    }

    let now = Utc::now();
    let model = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        name: Set(request.name.trim().to_string()),
        description: Set(request.description),
        status: Set("active".to_string()),
        lead_id: Set(request.lead_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let repo = ProjectRepository::new(&state.db);
    let row = repo.create(model).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "project.create").target("project", row.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Projects listed", body = ApiResponse<Vec<ProjectDto>>)
    ),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<Vec<ProjectDto>>>, ApiError> {
    let repo = ProjectRepository::new(&state.db);
    let rows = repo.list_by_tenant(&tenant.0).await?;

    Ok(Json(ApiResponse::new(
        rows.into_iter().map(ProjectDto::from).collect(),
    )))
}

/// Get one project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    responses(
        (status = 200, description = "Project retrieved", body = ApiResponse<ProjectDto>),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProjectDto>>, ApiError> {
    let repo = ProjectRepository::new(&state.db);
    let row = repo
        .find_by_id(&tenant.0, &id)
        .await?
        .ok_or_else(|| not_found("Project"))?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Update a project
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    request_body = UpdateProjectDto,
    responses(
        (status = 200, description = "Project updated", body = ApiResponse<ProjectDto>),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProjectDto>,
) -> Result<Json<ApiResponse<ProjectDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "project.update").await?;

    let repo = ProjectRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Project"));
    }

    if let Some(status) = &request.status
        && !PROJECT_STATUSES.contains(&status.as_str())
    {
        return Err(field_error("status", "Unknown project status"));
    }

    let mut update = project::ActiveModel::default();
    if let Some(name) = request.name {
        update.name = Set(name);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(status) = request.status {
        update.status = Set(status);
    }
    if let Some(lead_id) = request.lead_id {
        update.lead_id = Set(Some(lead_id));
    }

    let row = repo.update_by_id(&tenant.0, &id, update).await?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "project.update").target("project", row.id),
    )
    .await;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a project
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "project.delete").await?;

    let repo = ProjectRepository::new(&state.db);
    if !repo.delete_by_id(&tenant.0, &id).await? {
        return Err(not_found("Project"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Create a task under a project
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    request_body = CreateTaskDto,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<TaskDto>),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn create_task(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateTaskDto>,
) -> Result<(StatusCode, Json<ApiResponse<TaskDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "task.create").await?;

    let repo = ProjectRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Project"));
    }
    if request.title.trim().is_empty() {
        return Err(field_error("title", "Must not be empty"));
    }

    let now = Utc::now();
    let model = project_task::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        project_id: Set(id),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description),
        status: Set("todo".to_string()),
        assignee_id: Set(request.assignee_id),
        due_date: Set(request.due_date),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let row = repo.create_task(model).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List tasks of a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/tasks",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    responses(
        (status = 200, description = "Tasks listed", body = ApiResponse<Vec<TaskDto>>),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TaskDto>>>, ApiError> {
    let repo = ProjectRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Project"));
    }

    let rows = repo.list_tasks(&tenant.0, &id).await?;
    Ok(Json(ApiResponse::new(
        rows.into_iter().map(TaskDto::from).collect(),
    )))
}

/// Update a task
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task UUID")),
    request_body = UpdateTaskDto,
    responses(
        (status = 200, description = "Task updated", body = ApiResponse<TaskDto>),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn update_task(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskDto>,
) -> Result<Json<ApiResponse<TaskDto>>, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "task.update").await?;

    let repo = ProjectRepository::new(&state.db);
    if repo.find_task(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Task"));
    }

    if let Some(status) = &request.status
        && !TASK_STATUSES.contains(&status.as_str())
    {
        return Err(field_error("status", "Unknown task status"));
    }

    let mut update = project_task::ActiveModel::default();
    if let Some(title) = request.title {
        update.title = Set(title);
    }
    if let Some(description) = request.description {
        update.description = Set(Some(description));
    }
    if let Some(status) = request.status {
        update.status = Set(status);
    }
    if let Some(assignee_id) = request.assignee_id {
        update.assignee_id = Set(Some(assignee_id));
    }
    if let Some(due_date) = request.due_date {
        update.due_date = Set(Some(due_date));
    }

    let row = repo.update_task(&tenant.0, &id, update).await?;

    Ok(Json(ApiResponse::new(row.into())))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task UUID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, tenant, &principal, Permission::ManageProjects, "task.delete").await?;

    let repo = ProjectRepository::new(&state.db);
    if !repo.delete_task(&tenant.0, &id).await? {
        return Err(not_found("Task"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Log time against a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/time-entries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task UUID")),
    request_body = CreateTimeEntryDto,
    responses(
        (status = 201, description = "Time entry created", body = ApiResponse<TimeEntryDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn create_time_entry(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateTimeEntryDto>,
) -> Result<(StatusCode, Json<ApiResponse<TimeEntryDto>>), ApiError> {
    authorize(&state, tenant, &principal, Permission::LogTime, "time_entry.create").await?;

    let repo = ProjectRepository::new(&state.db);
    if repo.find_task(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Task"));
    }
    if !(1..=1440).contains(&request.minutes) {
        return Err(field_error("minutes", "Must be 1-1440"));
    }

    // Operator requests have no user to attribute time to.
    let user_id = principal
        .actor_id()
        .ok_or_else(|| field_error("user", "Time entries require a user token"))?;

    let now = Utc::now();
    let model = time_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.0),
        task_id: Set(id),
        user_id: Set(user_id),
        spent_on: Set(request.spent_on),
        minutes: Set(request.minutes),
        note: Set(request.note),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let row = repo.create_time_entry(model).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(row.into()))))
}

/// List time entries of a task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/time-entries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task UUID")),
    responses(
        (status = 200, description = "Time entries listed", body = ApiResponse<Vec<TimeEntryDto>>),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn list_time_entries(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TimeEntryDto>>>, ApiError> {
    let repo = ProjectRepository::new(&state.db);
    if repo.find_task(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Task"));
    }

    let rows = repo.list_time_entries(&tenant.0, &id).await?;
    Ok(Json(ApiResponse::new(
        rows.into_iter().map(TimeEntryDto::from).collect(),
    )))
}

/// Aggregated time for a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/time-summary",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Project UUID")),
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<TimeSummaryDto>),
        (status = 404, description = "Project not found", body = ApiError)
    ),
    tag = "projects"
)]
pub async fn time_summary(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TimeSummaryDto>>, ApiError> {
    let repo = ProjectRepository::new(&state.db);
    if repo.find_by_id(&tenant.0, &id).await?.is_none() {
        return Err(not_found("Project"));
    }

    let summary = repo.time_summary(&tenant.0, &id).await?;
    let mut by_user: Vec<UserMinutesDto> = summary
        .minutes_by_user
        .into_iter()
        .map(|(user_id, minutes)| UserMinutesDto { user_id, minutes })
        .collect();
    by_user.sort_by(|a, b| b.minutes.cmp(&a.minutes));

    Ok(Json(ApiResponse::new(TimeSummaryDto {
        total_minutes: summary.total_minutes,
        by_user,
    })))
}
