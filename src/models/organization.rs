//! Organization entity model
//!
//! Organizations carry the regulatory profile attributes that the
//! applicability engine evaluates filter rules against.

use super::tenant::Entity as Tenant;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant identifier for multi-tenancy
    pub tenant_id: Uuid,

    /// Legal name (unique per tenant)
    pub name: String,

    /// Russian tax identifier, 10 or 12 digits
    pub inn: Option<String>,

    /// Sector slug (e.g. healthcare, energy, telecom, government)
    pub sector: String,

    /// KII significance category, 0 = no KII objects, 1-3 per 187-ФЗ
    pub kii_category: i32,

    /// Personal-data protection level, 0 = no PDn processing, 1-4 per 152-ФЗ
    pub pdn_level: i32,

    pub employee_count: i32,

    /// Subject to Bank of Russia information-security regulation
    pub is_financial: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Tenant",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<Tenant> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
