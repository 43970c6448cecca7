//! Approval repository
//!
//! Approval routes (ordered role steps) and running instances.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::approval_instance::{self, Entity as ApprovalInstance};
use crate::models::approval_route::{self, Entity as ApprovalRoute};

/// One step of an approval route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalStep {
    pub position: i32,
    /// Role that must decide this step
    pub role: String,
}

/// Parse and order the steps stored on a route row.
pub fn parse_steps(steps: &JsonValue) -> Result<Vec<ApprovalStep>> {
    let mut parsed: Vec<ApprovalStep> =
        serde_json::from_value(steps.clone()).map_err(|e| anyhow!("malformed route steps: {e}"))?;
    parsed.sort_by_key(|step| step.position);
    Ok(parsed)
}

/// Repository for approval routes and instances
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    db: DatabaseConnection,
}

impl ApprovalRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    // Routes

    pub async fn create_route(
        &self,
        model: approval_route::ActiveModel,
    ) -> Result<approval_route::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("route id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = ApprovalRoute::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("route not persisted"))
    }

    pub async fn find_route(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<approval_route::Model>> {
        Ok(ApprovalRoute::find_by_id(*id)
            .filter(approval_route::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_routes(&self, tenant_id: &Uuid) -> Result<Vec<approval_route::Model>> {
        Ok(ApprovalRoute::find()
            .filter(approval_route::Column::TenantId.eq(*tenant_id))
            .order_by_asc(approval_route::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_route(&self, tenant_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = ApprovalRoute::delete_many()
            .filter(approval_route::Column::Id.eq(*id))
            .filter(approval_route::Column::TenantId.eq(*tenant_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    // Instances

    pub async fn create_instance(
        &self,
        model: approval_instance::ActiveModel,
    ) -> Result<approval_instance::Model> {
        let id = model
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("instance id must be set"))?;

        model.insert(&self.db).await?;

        let fetched = ApprovalInstance::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("instance not persisted"))
    }

    pub async fn find_instance(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<approval_instance::Model>> {
        Ok(ApprovalInstance::find_by_id(*id)
            .filter(approval_instance::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    /// The pending instance for a target, if one exists; at most one
    /// pending walk per target is allowed.
    pub async fn pending_instance_for_target(
        &self,
        tenant_id: &Uuid,
        target_type: &str,
        target_id: &Uuid,
    ) -> Result<Option<approval_instance::Model>> {
        Ok(ApprovalInstance::find()
            .filter(approval_instance::Column::TenantId.eq(*tenant_id))
            .filter(approval_instance::Column::TargetType.eq(target_type))
            .filter(approval_instance::Column::TargetId.eq(*target_id))
            .filter(approval_instance::Column::Status.eq("pending"))
            .one(&self.db)
            .await?)
    }

    pub async fn list_instances_for_target(
        &self,
        tenant_id: &Uuid,
        target_type: &str,
        target_id: &Uuid,
    ) -> Result<Vec<approval_instance::Model>> {
        Ok(ApprovalInstance::find()
            .filter(approval_instance::Column::TenantId.eq(*tenant_id))
            .filter(approval_instance::Column::TargetType.eq(target_type))
            .filter(approval_instance::Column::TargetId.eq(*target_id))
            .order_by_asc(approval_instance::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Persists an advanced or decided instance.
    pub async fn save_instance(
        &self,
        instance: approval_instance::Model,
        current_step: i32,
        status: &str,
        decisions: JsonValue,
    ) -> Result<approval_instance::Model> {
        let mut model: approval_instance::ActiveModel = instance.into();
        model.current_step = Set(current_step);
        model.status = Set(status.to_string());
        model.decisions = Set(decisions);
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_steps_orders_by_position() {
        let steps = json!([
            {"position": 2, "role": "admin"},
            {"position": 0, "role": "compliance_officer"},
            {"position": 1, "role": "auditor"},
        ]);
        let parsed = parse_steps(&steps).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].role, "compliance_officer");
        assert_eq!(parsed[2].role, "admin");
    }

    #[test]
    fn parse_steps_rejects_malformed_json() {
        assert!(parse_steps(&json!({"role": "admin"})).is_err());
        assert!(parse_steps(&json!([{"position": "first"}])).is_err());
    }

    #[test]
    fn parse_steps_accepts_empty_list() {
        assert!(parse_steps(&json!([])).unwrap().is_empty());
    }
}
