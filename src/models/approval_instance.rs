//! Approval instance entity model
//!
//! A running walk of an approval route against one target (document or
//! compliance record). Decision history accumulates in a JSONB array.

use super::approval_route::Entity as ApprovalRoute;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "approval_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub route_id: Uuid,

    /// document | compliance_record
    pub target_type: String,
    pub target_id: Uuid,

    /// Index of the step awaiting a decision
    pub current_step: i32,

    /// pending | approved | rejected | cancelled
    pub status: String,

    /// [{"step": 0, "user_id": "...", "decision": "approve", "comment": "...", "at": "..."}]
    #[sea_orm(column_type = "JsonBinary")]
    pub decisions: JsonValue,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "ApprovalRoute",
        from = "Column::RouteId",
        to = "super::approval_route::Column::Id"
    )]
    Route,
}

impl Related<ApprovalRoute> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
