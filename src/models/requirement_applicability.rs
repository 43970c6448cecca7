//! Requirement applicability mapping entity model
//!
//! One row per (tenant, requirement, organization) pair. The source tag
//! records whether the pair came from the rule engine (`automatic`) or a
//! manual override (`manual_include` / `manual_exclude`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requirement_applicability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub requirement_id: Uuid,
    pub organization_id: Uuid,

    /// automatic | manual_include | manual_exclude
    pub source: String,

    /// Rule that produced an automatic match, if any
    pub matched_rule_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
