//! Applicability mapping repository
//!
//! Persists the output of the applicability engine. Recompute replaces only
//! `automatic` rows; manual override rows are written and cleared through
//! dedicated methods and survive recomputes untouched.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::applicability::{Classified, ManualOverride, MappingSource};
use crate::models::requirement_applicability::{self, Entity as RequirementApplicability};

/// Repository for requirement-applicability mapping rows
#[derive(Debug, Clone)]
pub struct ApplicabilityRepository {
    db: DatabaseConnection,
}

impl ApplicabilityRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn list_for_requirement(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
    ) -> Result<Vec<requirement_applicability::Model>> {
        Ok(RequirementApplicability::find()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::RequirementId.eq(*requirement_id))
            .order_by_asc(requirement_applicability::Column::CreatedAt)
            .order_by_asc(requirement_applicability::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_for_organization(
        &self,
        tenant_id: &Uuid,
        organization_id: &Uuid,
    ) -> Result<Vec<requirement_applicability::Model>> {
        Ok(RequirementApplicability::find()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::OrganizationId.eq(*organization_id))
            .order_by_asc(requirement_applicability::Column::CreatedAt)
            .order_by_asc(requirement_applicability::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Manual override rows for one requirement, as engine input.
    pub async fn manual_overrides(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
    ) -> Result<Vec<ManualOverride>> {
        let rows = RequirementApplicability::find()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::RequirementId.eq(*requirement_id))
            .filter(requirement_applicability::Column::Source.ne(MappingSource::Automatic.as_str()))
            .all(&self.db)
            .await?;

        Ok(rows
            .iter()
            .map(|row| ManualOverride {
                organization_id: row.organization_id,
                include: row.source == MappingSource::ManualInclude.as_str(),
            })
            .collect())
    }

    /// Replaces the automatic rows of a requirement with a fresh
    /// classification. Manual rows are never touched; classified entries
    /// with a manual source are skipped because their rows already exist.
    pub async fn replace_automatic(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
        classified: &[Classified],
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        RequirementApplicability::delete_many()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::RequirementId.eq(*requirement_id))
            .filter(requirement_applicability::Column::Source.eq(MappingSource::Automatic.as_str()))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        for entry in classified {
            if entry.source != MappingSource::Automatic {
                continue;
            }
            let model = requirement_applicability::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(*tenant_id),
                requirement_id: Set(*requirement_id),
                organization_id: Set(entry.organization_id),
                source: Set(entry.source.as_str().to_string()),
                matched_rule_id: Set(entry.matched_rule_id),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            model.insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Sets a manual override for one pair, replacing any existing row.
    pub async fn set_override(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
        organization_id: &Uuid,
        include: bool,
    ) -> Result<requirement_applicability::Model> {
        let txn = self.db.begin().await?;

        RequirementApplicability::delete_many()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::RequirementId.eq(*requirement_id))
            .filter(requirement_applicability::Column::OrganizationId.eq(*organization_id))
            .exec(&txn)
            .await?;

        let source = if include {
            MappingSource::ManualInclude
        } else {
            MappingSource::ManualExclude
        };

        let id = Uuid::new_v4();
        let now = Utc::now();
        let model = requirement_applicability::ActiveModel {
            id: Set(id),
            tenant_id: Set(*tenant_id),
            requirement_id: Set(*requirement_id),
            organization_id: Set(*organization_id),
            source: Set(source.as_str().to_string()),
            matched_rule_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        model.insert(&txn).await?;

        txn.commit().await?;

        let fetched = RequirementApplicability::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("applicability override not persisted"))
    }

    /// Removes a manual override. Returns false when no manual row existed.
    pub async fn clear_override(
        &self,
        tenant_id: &Uuid,
        requirement_id: &Uuid,
        organization_id: &Uuid,
    ) -> Result<bool> {
        let result = RequirementApplicability::delete_many()
            .filter(requirement_applicability::Column::TenantId.eq(*tenant_id))
            .filter(requirement_applicability::Column::RequirementId.eq(*requirement_id))
            .filter(requirement_applicability::Column::OrganizationId.eq(*organization_id))
            .filter(
                requirement_applicability::Column::Source
                    .ne(MappingSource::Automatic.as_str()),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Requirement IDs applicable to an organization (automatic and manual
    /// includes; manual excludes suppress the pair entirely).
    pub async fn applicable_requirement_ids(
        &self,
        tenant_id: &Uuid,
        organization_id: &Uuid,
    ) -> Result<Vec<Uuid>> {
        let rows = self.list_for_organization(tenant_id, organization_id).await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.source != MappingSource::ManualExclude.as_str())
            .map(|row| row.requirement_id)
            .collect())
    }
}
