//! Control measure entity model

use super::control::Entity as Control;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

/// Concrete measure implementing a control, with a periodicity and due date
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "control_measures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub control_id: Uuid,

    pub title: String,
    pub description: Option<String>,

    /// once | monthly | quarterly | annual
    pub periodicity: String,

    /// planned | implemented | verified
    pub status: String,

    pub due_date: Option<Date>,
    pub completed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Control",
        from = "Column::ControlId",
        to = "super::control::Column::Id"
    )]
    Control,
}

impl Related<Control> for Entity {
    fn to() -> RelationDef {
        Relation::Control.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
