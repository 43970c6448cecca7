//! Control entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Security control implemented by the tenant (organizational or technical)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "controls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Internal control code (unique per tenant)
    pub code: String,

    pub title: String,
    pub description: Option<String>,

    /// organizational | technical
    pub control_type: String,

    pub owner_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::control_measure::Entity")]
    Measures,
}

impl Related<super::control_measure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Measures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
