//! Organization repository for database operations
//!
//! Tenant-scoped access to organizations with keyset pagination over
//! (created_at, id).

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::organization::{self, Entity as Organization};

/// Repository for organization database operations
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: DatabaseConnection,
}

impl OrganizationRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, model: organization::ActiveModel) -> Result<organization::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("organization id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Organization::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("organization not persisted"))
    }

    pub async fn find_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<organization::Model>> {
        Ok(Organization::find_by_id(*id)
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    /// Lists every organization of a tenant without pagination (used by the
    /// applicability engine, which classifies the full set).
    pub async fn find_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<organization::Model>> {
        Ok(Organization::find()
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .order_by_asc(organization::Column::CreatedAt)
            .order_by_asc(organization::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Lists organizations for a tenant with cursor pagination.
    pub async fn list_by_tenant(
        &self,
        tenant_id: &Uuid,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<organization::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Organization::find()
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .order_by_asc(organization::Column::CreatedAt)
            .order_by_asc(organization::Column::Id);

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(organization::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(organization::Column::CreatedAt.eq(data.created_at))
                        .add(organization::Column::Id.gt(data.id)),
                );
            query = query.filter(condition);
        }

        let mut rows = query.limit(limit + 1).all(&self.db).await?;

        let next_cursor = if rows.len() as u64 > limit {
            rows.pop();
            rows.last()
                .map(|last| encode_cursor(&last.created_at.to_utc(), &last.id))
        } else {
            None
        };

        Ok((rows, next_cursor))
    }

    /// Updates mutable fields; only fields set on `update` change.
    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: organization::ActiveModel,
    ) -> Result<organization::Model> {
        let existing = Organization::find_by_id(*id)
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Organization with ID '{}' not found for tenant", id))?;

        let mut model: organization::ActiveModel = existing.into();

        if let Some(name) = update.name.clone().take() {
            model.name = Set(name);
        }
        if let Some(inn) = update.inn.clone().take() {
            model.inn = Set(inn);
        }
        if let Some(sector) = update.sector.clone().take() {
            model.sector = Set(sector);
        }
        if let Some(kii_category) = update.kii_category.clone().take() {
            model.kii_category = Set(kii_category);
        }
        if let Some(pdn_level) = update.pdn_level.clone().take() {
            model.pdn_level = Set(pdn_level);
        }
        if let Some(employee_count) = update.employee_count.clone().take() {
            model.employee_count = Set(employee_count);
        }
        if let Some(is_financial) = update.is_financial.clone().take() {
            model.is_financial = Set(is_financial);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    /// Deletes an organization within a tenant scope.
    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Organization::delete_many()
            .filter(organization::Column::Id.eq(*id))
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
