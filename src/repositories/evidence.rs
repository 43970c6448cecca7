//! Evidence repository
//!
//! Evidence metadata rows and their polymorphic links to compliance
//! records and control measures.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::evidence::{self, Entity as Evidence};
use crate::models::evidence_link::{self, Entity as EvidenceLink};

/// Repository for evidence database operations
#[derive(Debug, Clone)]
pub struct EvidenceRepository {
    db: DatabaseConnection,
}

impl EvidenceRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, model: evidence::ActiveModel) -> Result<evidence::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("evidence id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Evidence::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("evidence not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<evidence::Model>> {
        Ok(Evidence::find_by_id(*id)
            .filter(evidence::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(
        &self,
        tenant_id: &Uuid,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<evidence::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Evidence::find()
            .filter(evidence::Column::TenantId.eq(*tenant_id))
            .order_by_asc(evidence::Column::CreatedAt)
            .order_by_asc(evidence::Column::Id);

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(evidence::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(evidence::Column::CreatedAt.eq(data.created_at))
                        .add(evidence::Column::Id.gt(data.id)),
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

    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: evidence::ActiveModel,
    ) -> Result<evidence::Model> {
        let existing = Evidence::find_by_id(*id)
            .filter(evidence::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Evidence with ID '{}' not found for tenant", id))?;

        let mut model: evidence::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(kind) = update.kind.clone().take() {
            model.kind = Set(kind);
        }
        if let Some(file_name) = update.file_name.clone().take() {
            model.file_name = Set(file_name);
        }
        if let Some(content_hash) = update.content_hash.clone().take() {
            model.content_hash = Set(content_hash);
        }
        if let Some(valid_until) = update.valid_until.clone().take() {
            model.valid_until = Set(valid_until);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Evidence::delete_many()
            .filter(evidence::Column::Id.eq(*id))
            .filter(evidence::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Attaches evidence to a target; duplicates hit the unique guard.
    pub async fn link(
        &self,
        tenant_id: &Uuid,
        evidence_id: &Uuid,
        target_type: &str,
        target_id: &Uuid,
    ) -> Result<evidence_link::Model> {
        let id = Uuid::new_v4();
        let model = evidence_link::ActiveModel {
            id: Set(id),
            tenant_id: Set(*tenant_id),
            evidence_id: Set(*evidence_id),
            target_type: Set(target_type.to_string()),
            target_id: Set(*target_id),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.db).await?;

        let fetched = EvidenceLink::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("evidence link not persisted"))
    }

    pub async fn unlink(
        &self,
        tenant_id: &Uuid,
        evidence_id: &Uuid,
        target_type: &str,
        target_id: &Uuid,
    ) -> Result<bool> {
        let result = EvidenceLink::delete_many()
            .filter(evidence_link::Column::TenantId.eq(*tenant_id))
            .filter(evidence_link::Column::EvidenceId.eq(*evidence_id))
            .filter(evidence_link::Column::TargetType.eq(target_type))
            .filter(evidence_link::Column::TargetId.eq(*target_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn links_for_evidence(
        &self,
        tenant_id: &Uuid,
        evidence_id: &Uuid,
    ) -> Result<Vec<evidence_link::Model>> {
        Ok(EvidenceLink::find()
            .filter(evidence_link::Column::TenantId.eq(*tenant_id))
            .filter(evidence_link::Column::EvidenceId.eq(*evidence_id))
            .order_by_asc(evidence_link::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn links_for_target(
        &self,
        tenant_id: &Uuid,
        target_type: &str,
        target_id: &Uuid,
    ) -> Result<Vec<evidence_link::Model>> {
        Ok(EvidenceLink::find()
            .filter(evidence_link::Column::TenantId.eq(*tenant_id))
            .filter(evidence_link::Column::TargetType.eq(target_type))
            .filter(evidence_link::Column::TargetId.eq(*target_id))
            .order_by_asc(evidence_link::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
