//! Document entity model
//!
//! Internal regulatory documents (policies, orders, instructions) with a
//! version counter and a review schedule driving the actuality checks.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub organization_id: Option<Uuid>,

    pub title: String,

    /// policy | order | regulation | instruction | report
    pub doc_kind: String,

    /// draft | on_approval | approved | archived
    pub status: String,

    /// Highest stored version number, 0 before the first version
    pub current_version: i32,

    pub review_interval_months: i32,

    /// Date the document must be re-reviewed by; stamped on approval
    pub next_review_at: Option<Date>,

    pub owner_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::document_version::Entity")]
    Versions,
}

impl Related<super::document_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
