//! Project repository (project-management/time-tracking module)

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::project::{self, Entity as Project};
use crate::models::project_task::{self, Entity as ProjectTask};
use crate::models::time_entry::{self, Entity as TimeEntry};

/// Aggregated time spent on one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSummary {
    pub total_minutes: i64,
    pub minutes_by_user: HashMap<Uuid, i64>,
}

/// Repository for projects, tasks and time entries
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    // Projects

    pub async fn create(&self, model: project::ActiveModel) -> Result<project::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("project id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Project::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("project not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<project::Model>> {
        Ok(Project::find_by_id(*id)
            .filter(project::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<project::Model>> {
        Ok(Project::find()
            .filter(project::Column::TenantId.eq(*tenant_id))
            .order_by_asc(project::Column::CreatedAt)
            .order_by_asc(project::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: project::ActiveModel,
    ) -> Result<project::Model> {
        let existing = Project::find_by_id(*id)
            .filter(project::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Project with ID '{}' not found for tenant", id))?;

        let mut model: project::ActiveModel = existing.into();

        if let Some(name) = update.name.clone().take() {
            model.name = Set(name);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(lead_id) = update.lead_id.clone().take() {
            model.lead_id = Set(lead_id);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Project::delete_many()
            .filter(project::Column::Id.eq(*id))
            .filter(project::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    // Tasks

    pub async fn create_task(&self, model: project_task::ActiveModel) -> Result<project_task::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("task id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = ProjectTask::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("task not persisted"))
    }

    pub async fn find_task(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<project_task::Model>> {
        Ok(ProjectTask::find_by_id(*id)
            .filter(project_task::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_tasks(
        &self,
        tenant_id: &Uuid,
        project_id: &Uuid,
    ) -> Result<Vec<project_task::Model>> {
        Ok(ProjectTask::find()
            .filter(project_task::Column::TenantId.eq(*tenant_id))
            .filter(project_task::Column::ProjectId.eq(*project_id))
            .order_by_asc(project_task::Column::CreatedAt)
            .order_by_asc(project_task::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_task(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: project_task::ActiveModel,
    ) -> Result<project_task::Model> {
        let existing = ProjectTask::find_by_id(*id)
            .filter(project_task::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Task with ID '{}' not found for tenant", id))?;

        let mut model: project_task::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(assignee_id) = update.assignee_id.clone().take() {
            model.assignee_id = Set(assignee_id);
        }
        if let Some(due_date) = update.due_date.clone().take() {
            model.due_date = Set(due_date);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_task(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = ProjectTask::delete_many()
            .filter(project_task::Column::Id.eq(*id))
            .filter(project_task::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    // Time entries

    pub async fn create_time_entry(
        &self,
        model: time_entry::ActiveModel,
    ) -> Result<time_entry::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("time entry id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = TimeEntry::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("time entry not persisted"))
    }

    pub async fn list_time_entries(
        &self,
        tenant_id: &Uuid,
        task_id: &Uuid,
    ) -> Result<Vec<time_entry::Model>> {
        Ok(TimeEntry::find()
            .filter(time_entry::Column::TenantId.eq(*tenant_id))
            .filter(time_entry::Column::TaskId.eq(*task_id))
            .order_by_asc(time_entry::Column::SpentOn)
            .order_by_asc(time_entry::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Total and per-user minutes across all tasks of a project.
    pub async fn time_summary(&self, tenant_id: &Uuid, project_id: &Uuid) -> Result<TimeSummary> {
        let task_ids: Vec<Uuid> = self
            .list_tasks(tenant_id, project_id)
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect();

        if task_ids.is_empty() {
            return Ok(TimeSummary::default());
        }

        let entries = TimeEntry::find()
            .filter(time_entry::Column::TenantId.eq(*tenant_id))
            .filter(time_entry::Column::TaskId.is_in(task_ids))
            .all(&self.db)
            .await?;

        let mut summary = TimeSummary::default();
        for entry in entries {
            summary.total_minutes += entry.minutes as i64;
            *summary.minutes_by_user.entry(entry.user_id).or_insert(0) += entry.minutes as i64;
        }

        Ok(summary)
    }
}
