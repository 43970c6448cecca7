//! Evidence entity model
//!
//! Metadata and a content hash only; binary payloads live outside this
//! service.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "evidence")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub title: String,
    pub description: Option<String>,

    /// document | screenshot | config_export | attestation | log_extract
    pub kind: String,

    pub file_name: Option<String>,

    /// SHA-256 hex digest of the stored artifact
    pub content_hash: Option<String>,

    /// Evidence past this date counts as expired
    pub valid_until: Option<Date>,

    pub uploaded_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::evidence_link::Entity")]
    Links,
}

impl Related<super::evidence_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Links.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
