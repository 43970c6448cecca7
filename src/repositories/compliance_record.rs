//! Compliance record repository
//!
//! Tenant-scoped access to compliance records, the ensure operation that
//! materializes rows for applicable (organization, requirement) pairs, and
//! the aggregate queries behind the dashboard and register export.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::export::RegisterRow;
use crate::models::compliance_record::{self, Entity as ComplianceRecord};
use crate::models::{organization, requirement, user};
use crate::workflow::RecordStatus;

/// Optional filters for record listings
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub organization_id: Option<Uuid>,
    pub requirement_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
}

/// Repository for compliance record database operations
#[derive(Debug, Clone)]
pub struct ComplianceRecordRepository {
    db: DatabaseConnection,
}

impl ComplianceRecordRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(
        &self,
        model: compliance_record::ActiveModel,
    ) -> Result<compliance_record::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("compliance record id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = ComplianceRecord::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("compliance record not persisted"))
    }

    /// Creates missing not_started records for the given applicable
    /// requirement IDs. Returns how many rows were created.
    pub async fn ensure_for_organization(
        &self,
        tenant_id: &Uuid,
        organization_id: &Uuid,
        applicable_requirement_ids: &[Uuid],
    ) -> Result<u64> {
        let existing: HashSet<Uuid> = ComplianceRecord::find()
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .filter(compliance_record::Column::OrganizationId.eq(*organization_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|record| record.requirement_id)
            .collect();

        let now = Utc::now();
        let mut created = 0u64;

        for requirement_id in applicable_requirement_ids {
            if existing.contains(requirement_id) {
                continue;
            }
            let model = compliance_record::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(*tenant_id),
                organization_id: Set(*organization_id),
                requirement_id: Set(*requirement_id),
                status: Set(RecordStatus::NotStarted.as_str().to_string()),
                assignee_id: Set(None),
                due_date: Set(None),
                notes: Set(None),
                reviewed_by: Set(None),
                reviewed_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            model.insert(&self.db).await?;
            created += 1;
        }

        Ok(created)
    }

    pub async fn find_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<compliance_record::Model>> {
        Ok(ComplianceRecord::find_by_id(*id)
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    /// Lists records with optional filters and cursor pagination.
    pub async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &RecordFilter,
        limit: u64,
        cursor: Option<String>,
    ) -> Result<(Vec<compliance_record::Model>, Option<String>)> {
        if limit == 0 {
            return Ok((Vec::new(), cursor));
        }

        let mut query = ComplianceRecord::find()
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .order_by_asc(compliance_record::Column::CreatedAt)
            .order_by_asc(compliance_record::Column::Id);

        if let Some(organization_id) = filter.organization_id {
            query = query.filter(compliance_record::Column::OrganizationId.eq(organization_id));
        }
        if let Some(requirement_id) = filter.requirement_id {
            query = query.filter(compliance_record::Column::RequirementId.eq(requirement_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(compliance_record::Column::Status.eq(status.as_str()));
        }

        if let Some(cursor) = cursor
            && !cursor.is_empty()
        {
            let data = decode_cursor(&cursor).map_err(|e| anyhow!("{}", e.message))?;
            let condition = Condition::any()
                .add(compliance_record::Column::CreatedAt.gt(data.created_at))
                .add(
                    Condition::all()
                        .add(compliance_record::Column::CreatedAt.eq(data.created_at))
                        .add(compliance_record::Column::Id.gt(data.id)),
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

    /// Updates assignment fields; the status column moves only through
    /// [`Self::set_status`].
    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: compliance_record::ActiveModel,
    ) -> Result<compliance_record::Model> {
        let existing = ComplianceRecord::find_by_id(*id)
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("Compliance record with ID '{}' not found for tenant", id))?;

        let mut model: compliance_record::ActiveModel = existing.into();

        if let Some(assignee_id) = update.assignee_id.clone().take() {
            model.assignee_id = Set(assignee_id);
        }
        if let Some(due_date) = update.due_date.clone().take() {
            model.due_date = Set(due_date);
        }
        if let Some(notes) = update.notes.clone().take() {
            model.notes = Set(notes);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    /// Applies a validated status transition, stamping reviewer fields on
    /// review outcomes.
    pub async fn set_status(
        &self,
        record: compliance_record::Model,
        status: RecordStatus,
        reviewer: Option<Uuid>,
    ) -> Result<compliance_record::Model> {
        let mut model: compliance_record::ActiveModel = record.into();
        model.status = Set(status.as_str().to_string());
        if status.is_review_outcome() {
            model.reviewed_by = Set(reviewer);
            model.reviewed_at = Set(Some(Utc::now().into()));
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }

    /// Record counts per workflow status for one tenant.
    pub async fn status_counts(&self, tenant_id: &Uuid) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for status in [
            RecordStatus::NotStarted,
            RecordStatus::InProgress,
            RecordStatus::PendingReview,
            RecordStatus::Approved,
            RecordStatus::Rejected,
        ] {
            let count = ComplianceRecord::find()
                .filter(compliance_record::Column::TenantId.eq(*tenant_id))
                .filter(compliance_record::Column::Status.eq(status.as_str()))
                .count(&self.db)
                .await?;
            counts.insert(status.as_str().to_string(), count);
        }
        Ok(counts)
    }

    /// Approved record count for one organization.
    pub async fn approved_count_for_org(
        &self,
        tenant_id: &Uuid,
        organization_id: &Uuid,
    ) -> Result<u64> {
        Ok(ComplianceRecord::find()
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .filter(compliance_record::Column::OrganizationId.eq(*organization_id))
            .filter(compliance_record::Column::Status.eq(RecordStatus::Approved.as_str()))
            .count(&self.db)
            .await?)
    }

    /// Records past their due date that are not yet approved.
    pub async fn overdue_count(&self, tenant_id: &Uuid, today: NaiveDate) -> Result<u64> {
        Ok(ComplianceRecord::find()
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .filter(compliance_record::Column::DueDate.is_not_null())
            .filter(compliance_record::Column::DueDate.lt(today))
            .filter(compliance_record::Column::Status.ne(RecordStatus::Approved.as_str()))
            .count(&self.db)
            .await?)
    }

    /// Assembles the full compliance register for export.
    pub async fn register_rows(&self, tenant_id: &Uuid) -> Result<Vec<RegisterRow>> {
        let records = ComplianceRecord::find()
            .filter(compliance_record::Column::TenantId.eq(*tenant_id))
            .order_by_asc(compliance_record::Column::CreatedAt)
            .order_by_asc(compliance_record::Column::Id)
            .all(&self.db)
            .await?;

        let organizations: HashMap<Uuid, String> = organization::Entity::find()
            .filter(organization::Column::TenantId.eq(*tenant_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|org| (org.id, org.name))
            .collect();

        let requirements: HashMap<Uuid, (String, String)> = requirement::Entity::find()
            .filter(
                Condition::any()
                    .add(requirement::Column::TenantId.eq(*tenant_id))
                    .add(requirement::Column::TenantId.is_null()),
            )
            .all(&self.db)
            .await?
            .into_iter()
            .map(|req| (req.id, (req.code, req.title)))
            .collect();

        let users: HashMap<Uuid, String> = user::Entity::find()
            .filter(user::Column::TenantId.eq(*tenant_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.email))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let (code, title) = requirements
                    .get(&record.requirement_id)
                    .cloned()
                    .unwrap_or_else(|| ("?".to_string(), "unknown requirement".to_string()));
                RegisterRow {
                    organization: organizations
                        .get(&record.organization_id)
                        .cloned()
                        .unwrap_or_else(|| "unknown organization".to_string()),
                    requirement_code: code,
                    requirement_title: title,
                    status: record.status,
                    due_date: record.due_date,
                    assignee: record.assignee_id.and_then(|id| users.get(&id).cloned()),
                }
            })
            .collect())
    }
}
