//! Tenant repository for database operations

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::models::tenant::{self, Entity as Tenant};

/// Parameters for creating a tenant
#[derive(Debug, Clone)]
pub struct CreateTenantRequest {
    pub name: String,
}

/// Repository for tenant database operations
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a new tenant row.
    pub async fn create_tenant(&self, request: CreateTenantRequest) -> Result<tenant::Model> {
        let id = Uuid::new_v4();
        let model = tenant::ActiveModel {
            id: Set(id),
            name: Set(request.name),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.db).await?;

        // Fetch back so SQLite returns the same shape as Postgres
        let fetched = Tenant::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow::anyhow!("tenant not persisted"))
    }

    pub async fn get_tenant_by_id(&self, id: Uuid) -> Result<Option<tenant::Model>> {
        Ok(Tenant::find_by_id(id).one(&self.db).await?)
    }

    /// Lists every tenant ordered by creation time (operator surface).
    pub async fn list_all(&self) -> Result<Vec<tenant::Model>> {
        Ok(Tenant::find()
            .order_by_asc(tenant::Column::CreatedAt)
            .order_by_asc(tenant::Column::Id)
            .all(&self.db)
            .await?)
    }
}
