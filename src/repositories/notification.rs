//! Notification repository
//!
//! Notification rules and the delivered in-app notification rows.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::notification::{self, Entity as Notification};
use crate::models::notification_rule::{self, Entity as NotificationRule};

/// Repository for notification rules and notifications
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    db: DatabaseConnection,
}

impl NotificationRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    // Rules

    pub async fn create_rule(
        &self,
        model: notification_rule::ActiveModel,
    ) -> Result<notification_rule::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("rule id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = NotificationRule::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("rule not persisted"))
    }

    pub async fn find_rule(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<notification_rule::Model>> {
        Ok(NotificationRule::find_by_id(*id)
            .filter(notification_rule::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_rules(&self, tenant_id: &Uuid) -> Result<Vec<notification_rule::Model>> {
        Ok(NotificationRule::find()
            .filter(notification_rule::Column::TenantId.eq(*tenant_id))
            .order_by_asc(notification_rule::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn update_rule(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: notification_rule::ActiveModel,
    ) -> Result<notification_rule::Model> {
        let existing = NotificationRule::find_by_id(*id)
            .filter(notification_rule::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Rule with ID '{}' not found for tenant", id))?;

        let mut model: notification_rule::ActiveModel = existing.into();

        if let Some(name) = update.name.clone().take() {
            model.name = Set(name);
        }
        if let Some(event_kind) = update.event_kind.clone().take() {
            model.event_kind = Set(event_kind);
        }
        if let Some(days_before) = update.days_before.clone().take() {
            model.days_before = Set(days_before);
        }
        if let Some(channel) = update.channel.clone().take() {
            model.channel = Set(channel);
        }
        if let Some(enabled) = update.enabled.clone().take() {
            model.enabled = Set(enabled);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    pub async fn delete_rule(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = NotificationRule::delete_many()
            .filter(notification_rule::Column::Id.eq(*id))
            .filter(notification_rule::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    // Notifications

    /// Lists notifications with an optional status filter and cursor
    /// pagination.
    pub async fn list(
        &self,
        tenant_id: &Uuid,
        status: Option<&str>,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<notification::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = Notification::find()
            .filter(notification::Column::TenantId.eq(*tenant_id))
            .order_by_asc(notification::Column::CreatedAt)
            .order_by_asc(notification::Column::Id);

        if let Some(status) = status {
            query = query.filter(notification::Column::Status.eq(status));
        }

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(notification::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(notification::Column::CreatedAt.eq(data.created_at))
                        .add(notification::Column::Id.gt(data.id)),
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

    /// Marks a notification dismissed. Returns None when it does not exist
    /// in the tenant scope.
    pub async fn dismiss(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<notification::Model>> {
        let Some(existing) = Notification::find_by_id(*id)
            .filter(notification::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut model: notification::ActiveModel = existing.into();
        model.status = Set("dismissed".to_string());

        Ok(Some(model.update(&self.db).await?))
    }
}
