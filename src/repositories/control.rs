//! Control repository
//!
//! Controls, their requirement links, and the measures implementing them.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::control::{self, Entity as Control};
use crate::models::control_measure::{self, Entity as ControlMeasure};
use crate::models::requirement_control::{self, Entity as RequirementControl};

/// Repository for control database operations
#[derive(Debug, Clone)]
pub struct ControlRepository {
    db: DatabaseConnection,
}

impl ControlRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, model: control::ActiveModel) -> Result<control::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("control id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Control::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("control not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<control::Model>> {
        Ok(Control::find_by_id(*id)
            .filter(control::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<control::Model>> {
        Ok(Control::find()
            .filter(control::Column::TenantId.eq(*tenant_id))
            .order_by_asc(control::Column::Code)
            .all(&self.db)
            .await?)
    }

    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: control::ActiveModel,
    ) -> Result<control::Model> {
        let existing = Control::find_by_id(*id)
            .filter(control::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Control with ID '{}' not found for tenant", id))?;

        let mut model: control::ActiveModel = existing.into();

        if let Some(code) = update.code.clone().take() {
            model.code = Set(code);
        }
        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(control_type) = update.control_type.clone().take() {
            model.control_type = Set(control_type);
        }
        if let Some(owner_id) = update.owner_id.clone().take() {
            model.owner_id = Set(owner_id);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Control::delete_many()
            .filter(control::Column::Id.eq(*id))
            .filter(control::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Links a control to a requirement; the unique pair guard maps
    /// duplicates to a conflict.
    pub async fn link_requirement(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
        control_id: &Uuid,
    ) -> Result<requirement_control::Model> {
        let id = Uuid::new_v4();
        let model = requirement_control::ActiveModel {
            id: Set(id),
            tenant_id: Set(*tenant_id),
            requirement_id: Set(*requirement_id),
            control_id: Set(*control_id),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.db).await?;

        let fetched = RequirementControl::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("requirement link not persisted"))
    }

    pub async fn unlink_requirement(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
        control_id: &Uuid,
    ) -> Result<bool> {
        let result = RequirementControl::delete_many()
            .filter(requirement_control::Column::TenantId.eq(*tenant_id))
            .filter(requirement_control::Column::RequirementId.eq(*requirement_id))
            .filter(requirement_control::Column::ControlId.eq(*control_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn linked_requirement_ids(
        &self,
        tenant_id: &Uuid,
        control_id: &Uuid,
    ) -> Result<Vec<Uuid>> {
        Ok(RequirementControl::find()
            .filter(requirement_control::Column::TenantId.eq(*tenant_id))
            .filter(requirement_control::Column::ControlId.eq(*control_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.requirement_id)
            .collect())
    }

    // Measures

    pub async fn create_measure(
        &self,
        model: control_measure::ActiveModel,
    ) -> Result<control_measure::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("measure id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = ControlMeasure::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("measure not persisted"))
    }

    pub async fn find_measure(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<control_measure::Model>> {
        Ok(ControlMeasure::find_by_id(*id)
            .filter(control_measure::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_measures(
        &self,
        tenant_id: &Uuid,
        control_id: &Uuid,
    ) -> Result<Vec<control_measure::Model>> {
        Ok(ControlMeasure::find()
            .filter(control_measure::Column::TenantId.eq(*tenant_id))
            .filter(control_measure::Column::ControlId.eq(*control_id))
            .order_by_asc(control_measure::Column::CreatedAt)
            .order_by_asc(control_measure::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_measure(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: control_measure::ActiveModel,
    ) -> Result<control_measure::Model> {
        let existing = ControlMeasure::find_by_id(*id)
            .filter(control_measure::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Measure with ID '{}' not found for tenant", id))?;

        let mut model: control_measure::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(periodicity) = update.periodicity.clone().take() {
            model.periodicity = Set(periodicity);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(due_date) = update.due_date.clone().take() {
            model.due_date = Set(due_date);
        }
        if let Some(completed_at) = update.completed_at.clone().take() {
            model.completed_at = Set(completed_at);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_measure(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = ControlMeasure::delete_many()
            .filter(control_measure::Column::Id.eq(*id))
            .filter(control_measure::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
