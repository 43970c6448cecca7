//! Requirement repository for database operations
//!
//! Visibility covers both tenant-owned rows and shared catalog rows
//! (tenant_id NULL); mutations are restricted to tenant-owned rows.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::applicability_rule::{self, Entity as ApplicabilityRule};
use crate::models::requirement::{self, Entity as Requirement};

/// Replacement rule payload for [`RequirementRepository::replace_rules`]
#[derive(Debug, Clone, Default)]
pub struct NewRule {
    pub kii_categories: Option<Vec<i32>>,
    pub pdn_levels: Option<Vec<i32>>,
    pub sectors: Option<Vec<String>>,
    pub min_employee_count: Option<i32>,
    pub max_employee_count: Option<i32>,
    pub requires_financial: Option<bool>,
}

/// Repository for requirement and applicability-rule database operations
#[derive(Debug, Clone)]
pub struct RequirementRepository {
    db: DatabaseConnection,
}

impl RequirementRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn visible_condition(tenant_id: &Uuid) -> Condition {
        Condition::any()
            .add(requirement::Column::TenantId.eq(*tenant_id))
            .add(requirement::Column::TenantId.is_null())
    }

    pub async fn create(&self, model: requirement::ActiveModel) -> Result<requirement::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("requirement id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Requirement::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("requirement not persisted"))
    }

    /// Finds a requirement visible to the tenant (own row or catalog row).
    pub async fn find_visible_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<requirement::Model>> {
        Ok(Requirement::find_by_id(*id)
            .filter(Self::visible_condition(tenant_id))
            .one(&self.db)
            .await?)
    }

    /// Lists catalog plus tenant-owned requirements with cursor pagination.
    pub async fn list_visible(
        &self,
        tenant_id: &Uuid,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<requirement::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Requirement::find()
            .filter(Self::visible_condition(tenant_id))
            .order_by_asc(requirement::Column::CreatedAt)
            .order_by_asc(requirement::Column::Id);

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(requirement::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(requirement::Column::CreatedAt.eq(data.created_at))
                        .add(requirement::Column::Id.gt(data.id)),
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

    /// Updates a tenant-owned requirement; catalog rows are not reachable.
    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: requirement::ActiveModel,
    ) -> Result<requirement::Model> {
        let existing = Requirement::find_by_id(*id)
            .filter(requirement::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Requirement with ID '{}' not found for tenant", id))?;

        let mut model: requirement::ActiveModel = existing.into();

        if let Some(code) = update.code.clone().take() {
            model.code = Set(code);
        }
        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(regulator) = update.regulator.clone().take() {
            model.regulator = Set(regulator);
        }
        if let Some(category) = update.category.clone().take() {
            model.category = Set(category);
        }
        if let Some(effective_from) = update.effective_from.clone().take() {
            model.effective_from = Set(effective_from);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Requirement::delete_many()
            .filter(requirement::Column::Id.eq(*id))
            .filter(requirement::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Rules attached to one requirement, oldest first.
    pub async fn rules_for(&self, requirement_id: &Uuid) -> Result<Vec<applicability_rule::Model>> {
        Ok(ApplicabilityRule::find()
            .filter(applicability_rule::Column::RequirementId.eq(*requirement_id))
            .order_by_asc(applicability_rule::Column::CreatedAt)
            .order_by_asc(applicability_rule::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Replaces the full rule set of a requirement in one transaction.
    pub async fn replace_rules(
        &self,
        requirement_id: &Uuid,
        rules: Vec<NewRule>,
    ) -> Result<Vec<applicability_rule::Model>> {
        let txn = self.db.begin().await?;

        ApplicabilityRule::delete_many()
            .filter(applicability_rule::Column::RequirementId.eq(*requirement_id))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        for rule in rules {
            let model = applicability_rule::ActiveModel {
                id: Set(Uuid::new_v4()),
                requirement_id: Set(*requirement_id),
                kii_categories: Set(rule.kii_categories.map(|v| serde_json::json!(v))),
                pdn_levels: Set(rule.pdn_levels.map(|v| serde_json::json!(v))),
                sectors: Set(rule.sectors.map(|v| serde_json::json!(v))),
                min_employee_count: Set(rule.min_employee_count),
                max_employee_count: Set(rule.max_employee_count),
                requires_financial: Set(rule.requires_financial),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            model.insert(&txn).await?;
        }

        txn.commit().await?;

        self.rules_for(requirement_id).await
    }
}
