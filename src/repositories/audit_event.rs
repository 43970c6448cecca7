//! Audit event repository
//!
//! Read side of the audit trail; writes go through [`crate::audit`].

use anyhow::{Result, anyhow};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::audit_event::{self, Entity as AuditEvent};

/// Optional filters for audit listings
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub result: Option<String>,
}

/// Repository for audit event queries
#[derive(Debug, Clone)]
pub struct AuditEventRepository {
    db: DatabaseConnection,
}

impl AuditEventRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    /// Lists audit events oldest-first with cursor pagination.
    pub async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &AuditFilter,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<audit_event::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = AuditEvent::find()
            .filter(audit_event::Column::TenantId.eq(*tenant_id))
            .order_by_asc(audit_event::Column::OccurredAt)
            .order_by_asc(audit_event::Column::Id);

        if let Some(action) = &filter.action {
            query = query.filter(audit_event::Column::Action.eq(action));
        }
        if let Some(target_type) = &filter.target_type {
            query = query.filter(audit_event::Column::TargetType.eq(target_type));
        }
        if let Some(result) = &filter.result {
            query = query.filter(audit_event::Column::Result.eq(result));
        }

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(audit_event::Column::OccurredAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(audit_event::Column::OccurredAt.eq(data.created_at))
                        .add(audit_event::Column::Id.gt(data.id)),
                );
            query = query.filter(condition);
        }

        let mut rows = query.limit(limit + 1).all(&self.db).await?;

        let next_cursor = if rows.len() as u64 > limit {
            rows.pop();
            rows.last()
                .map(|last| encode_cursor(&last.occurred_at.to_utc(), &last.id))
        } else {
            None
        };

        Ok((rows, next_cursor))
    }
}
