//! Document repository
//!
//! Documents with their immutable version history and the review-schedule
//! queries behind the actuality checks.

use anyhow::{Result, anyhow};
use chrono::{Months, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::document::{self, Entity as Document};
use crate::models::document_version::{self, Entity as DocumentVersion};

/// Repository for document database operations
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
}

impl DocumentRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, model: document::ActiveModel) -> Result<document::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("document id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = Document::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("document not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<document::Model>> {
        Ok(Document::find_by_id(*id)
            .filter(document::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(
        &self,
        tenant_id: &Uuid,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<document::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Document::find()
            .filter(document::Column::TenantId.eq(*tenant_id))
            .order_by_asc(document::Column::CreatedAt)
            .order_by_asc(document::Column::Id);

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(document::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(document::Column::CreatedAt.eq(data.created_at))
                        .add(document::Column::Id.gt(data.id)),
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
        update: document::ActiveModel,
    ) -> Result<document::Model> {
        let existing = Document::find_by_id(*id)
            .filter(document::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Document with ID '{}' not found for tenant", id))?;

        let mut model: document::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(doc_kind) = update.doc_kind.clone().take() {
            model.doc_kind = Set(doc_kind);
        }
        if let Some(organization_id) = update.organization_id.clone().take() {
            model.organization_id = Set(organization_id);
        }
        if let Some(review_interval_months) = update.review_interval_months.clone().take() {
            model.review_interval_months = Set(review_interval_months);
        }
        if let Some(owner_id) = update.owner_id.clone().take() {
            model.owner_id = Set(owner_id);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = Document::delete_many()
            .filter(document::Column::Id.eq(*id))
            .filter(document::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Stores a new version and advances the document's version counter in
    /// one transaction. Adding a version to an approved document moves it
    /// back to draft.
    pub async fn add_version(
        &self,
        doc: document::Model,
        body: String,
        change_summary: Option<String>,
        created_by: Option<Uuid>,
    ) -> Result<(document::Model, document_version::Model)> {
        let txn = self.db.begin().await?;

        let next_version = doc.current_version + 1;
        let now = Utc::now();

        let version_id = Uuid::new_v4();
        let version = document_version::ActiveModel {
            id: Set(version_id),
            tenant_id: Set(doc.tenant_id),
            document_id: Set(doc.id),
            version: Set(next_version),
            body: Set(body),
            change_summary: Set(change_summary),
            created_by: Set(created_by),
            created_at: Set(now.into()),
        };
        version.insert(&txn).await?;

        let doc_id = doc.id;
        let was_approved = doc.status == "approved";
        let mut doc_model: document::ActiveModel = doc.into();
        doc_model.current_version = Set(next_version);
        if was_approved {
            doc_model.status = Set("draft".to_string());
            doc_model.next_review_at = Set(None);
        }
        doc_model.updated_at = Set(now.into());
        doc_model.update(&txn).await?;

        txn.commit().await?;

        let doc = Document::find_by_id(doc_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("document disappeared during version insert"))?;
        let version = DocumentVersion::find_by_id(version_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("document version not persisted"))?;

        Ok((doc, version))
    }

    pub async fn versions(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Vec<document_version::Model>> {
        Ok(DocumentVersion::find()
            .filter(document_version::Column::TenantId.eq(*tenant_id))
            .filter(document_version::Column::DocumentId.eq(*document_id))
            .order_by_asc(document_version::Column::Version)
            .all(&self.db)
            .await?)
    }

    pub async fn find_version(
        &self,
        tenant_id: &Uuid,
        document_id: &Uuid,
        version: i32,
    ) -> Result<Option<document_version::Model>> {
        Ok(DocumentVersion::find()
            .filter(document_version::Column::TenantId.eq(*tenant_id))
            .filter(document_version::Column::DocumentId.eq(*document_id))
            .filter(document_version::Column::Version.eq(version))
            .one(&self.db)
            .await?)
    }

    /// Moves a document between workflow statuses, stamping the next review
    /// date when it enters `approved`.
    pub async fn set_status(
        &self,
        doc: document::Model,
        status: &str,
        today: NaiveDate,
    ) -> Result<document::Model> {
        let review_interval = doc.review_interval_months.max(1) as u32;
        let mut model: document::ActiveModel = doc.into();

        if status == "approved" {
            model.next_review_at = Set(today.checked_add_months(Months::new(review_interval)));
        }
        model.status = Set(status.to_string());
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    /// Approved documents whose next review date falls inside the window.
    pub async fn review_due(
        &self,
        tenant_id: &Uuid,
        today: NaiveDate,
        within_days: i64,
    ) -> Result<Vec<document::Model>> {
        let window_end = today + chrono::Duration::days(within_days.max(0));
        Ok(Document::find()
            .filter(document::Column::TenantId.eq(*tenant_id))
            .filter(document::Column::Status.eq("approved"))
            .filter(document::Column::NextReviewAt.is_not_null())
            .filter(document::Column::NextReviewAt.lte(window_end))
            .order_by_asc(document::Column::NextReviewAt)
            .all(&self.db)
            .await?)
    }
}
