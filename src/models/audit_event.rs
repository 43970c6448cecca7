//! Audit event entity model
//!
//! Append-only trail of mutating API actions and authorization denials.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Acting user; NULL for operator-token requests
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<String>,

    /// Verb-object action slug, e.g. "organization.create"
    pub action: String,

    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,

    /// success | denied | error
    pub result: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Option<JsonValue>,

    pub trace_id: Option<String>,

    pub occurred_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
