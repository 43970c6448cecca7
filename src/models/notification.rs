//! Notification entity model
//!
//! Rows are inserted by the sweep; the unique (rule, target, due_at) guard
//! in the schema keeps re-runs idempotent.

use super::notification_rule::Entity as NotificationRule;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub rule_id: Uuid,

    /// compliance_record | document | control_measure | evidence
    pub target_type: String,
    pub target_id: Uuid,

    pub message: String,

    /// Deadline the notification points at
    pub due_at: DateTimeWithTimeZone,

    /// pending | sent | dismissed
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "NotificationRule",
        from = "Column::RuleId",
        to = "super::notification_rule::Column::Id"
    )]
    Rule,
}

impl Related<NotificationRule> for Entity {
    fn to() -> RelationDef {
        Relation::Rule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
