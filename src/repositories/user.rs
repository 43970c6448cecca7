//! User repository for database operations

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::user::{self, Entity as User};

/// Parameters for creating a user
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub token_sha256: String,
}

/// Repository for user database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, params: CreateUserParams) -> Result<user::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(id),
            tenant_id: Set(params.tenant_id),
            email: Set(params.email),
            display_name: Set(params.display_name),
            role: Set(params.role),
            token_sha256: Set(params.token_sha256),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        model.insert(&self.db).await?;

        let fetched = User::find_by_id(id).one(&self.db).await?;
        fetched.ok_or_else(|| anyhow!("user not persisted"))
    }

    pub async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(*id)
            .filter(user::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<user::Model>> {
        Ok(User::find()
            .filter(user::Column::TenantId.eq(*tenant_id))
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Updates mutable fields; only fields set on `update` change.
    pub async fn update_by_id(
        &self,
        tenant_id: &Uuid,
        id: &Uuid,
        update: user::ActiveModel,
    ) -> Result<user::Model> {
        let existing = User::find_by_id(*id)
            .filter(user::Column::TenantId.eq(*tenant_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("User with ID '{}' not found for tenant", id))?;

        let mut model: user::ActiveModel = existing.into();

        if let Some(display_name) = update.display_name.clone().take() {
            model.display_name = Set(display_name);
        }
        if let Some(role) = update.role.clone().take() {
            model.role = Set(role);
        }
        if let Some(is_active) = update.is_active.clone().take() {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&self.db).await?)
    }
}
