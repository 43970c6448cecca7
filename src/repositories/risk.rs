//! Risk repository

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::risk::{self, Entity as Risk, risk_level};

/// Repository for risk database operations
#[derive(Debug, Clone)]
pub struct RiskRepository {
    db: DatabaseConnection,
}

impl RiskRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, model: risk::ActiveModel) -> Result<risk::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("risk id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Risk::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("risk not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<risk::Model>> {
        Ok(Risk::find_by_id(*id)
            .filter(risk::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(
        &self,
        tenant_id: &Uuid,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<risk::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Risk::find()
            .filter(risk::Column::TenantId.eq(*tenant_id))
            .order_by_asc(risk::Column::CreatedAt)
            .order_by_asc(risk::Column::Id);

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(risk::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(risk::Column::CreatedAt.eq(data.created_at))
                        .add(risk::Column::Id.gt(data.id)),
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

    /// Updates mutable fields; the level column is re-derived whenever
    /// likelihood or impact moves.
    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: risk::ActiveModel,
    ) -> Result<risk::Model> {
        let existing = Risk::find_by_id(*id)
            .filter(risk::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Risk with ID '{}' not found for tenant", id))?;

        let mut likelihood = existing.likelihood;
        let mut impact = existing.impact;
        let mut model: risk::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(category) = update.category.clone().take() {
            model.category = Set(category);
        }
        if let Some(value) = update.likelihood.clone().take() {
            likelihood = value;
            model.likelihood = Set(value);
        }
        if let Some(value) = update.impact.clone().take() {
            impact = value;
            model.impact = Set(value);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(owner_id) = update.owner_id.clone().take() {
            model.owner_id = Set(owner_id);
        }
        if let Some(treatment_plan) = update.treatment_plan.clone().take() {
            model.treatment_plan = Set(treatment_plan);
        }
        if let Some(review_due) = update.review_due.clone().take() {
            model.review_due = Set(review_due);
        }
        if let Some(organization_id) = update.organization_id.clone().take() {
            model.organization_id = Set(organization_id);
        }

        model.level = Set(risk_level(likelihood, impact).to_string());
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Risk::delete_many()
            .filter(risk::Column::Id.eq(*id))
            .filter(risk::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Open-risk counts per level for the dashboard.
    pub async fn level_counts(&self, tenant_id: &Uuid) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for level in ["low", "medium", "high", "critical"] {
            let count = Risk::find()
                .filter(risk::Column::TenantId.eq(*tenant_id))
                .filter(risk::Column::Level.eq(level))
                .filter(risk::Column::Status.ne("closed"))
                .count(&self.db)
                .await?;
            counts.insert(level.to_string(), count);
        }
        Ok(counts)
    }
}
