//! Applicability rule entity model
//!
//! One declarative filter rule attached to a requirement. Predicate lists
//! are stored as JSONB arrays; a NULL predicate is a wildcard.

use super::requirement::Entity as Requirement;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "applicability_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub requirement_id: Uuid,

    /// Matching KII categories (JSON array of integers), NULL = any
    #[sea_orm(column_type = "JsonBinary")]
    pub kii_categories: Option<JsonValue>,

    /// Matching PDn levels (JSON array of integers), NULL = any
    #[sea_orm(column_type = "JsonBinary")]
    pub pdn_levels: Option<JsonValue>,

    /// Matching sector slugs (JSON array of strings), NULL = any
    #[sea_orm(column_type = "JsonBinary")]
    pub sectors: Option<JsonValue>,

    pub min_employee_count: Option<i32>,
    pub max_employee_count: Option<i32>,

    /// When set, the organization's is_financial flag must equal this
    pub requires_financial: Option<bool>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Requirement",
        from = "Column::RequirementId",
        to = "super::requirement::Column::Id"
    )]
    Requirement,
}

impl Related<Requirement> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
