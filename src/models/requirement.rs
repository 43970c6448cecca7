//! Requirement entity model
//!
//! Requirements with a NULL tenant_id are shared catalog rows seeded from
//! the regulatory baseline; tenant-owned rows are custom requirements.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requirements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// NULL marks a shared catalog row readable by every tenant
    pub tenant_id: Option<Uuid>,

    /// Short regulatory reference, e.g. "152-ФЗ ст.19"
    pub code: String,

    pub title: String,
    pub description: Option<String>,

    /// Issuing regulator slug (fstec|fsb|cbr|rkn|internal)
    pub regulator: String,

    /// Grouping category (pdn|kii|financial|general)
    pub category: String,

    pub effective_from: Option<Date>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::applicability_rule::Entity")]
    ApplicabilityRules,
}

impl Related<super::applicability_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicabilityRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
