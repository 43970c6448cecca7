//! # Data Models
//!
//! This module contains all the data models used throughout the Compliance API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod applicability_rule;
pub mod approval_instance;
pub mod approval_route;
pub mod audit_event;
pub mod compliance_record;
pub mod control;
pub mod control_measure;
pub mod document;
pub mod document_version;
pub mod evidence;
pub mod evidence_link;
pub mod notification;
pub mod notification_rule;
pub mod organization;
pub mod project;
pub mod project_task;
pub mod requirement;
pub mod requirement_applicability;
pub mod requirement_control;
pub mod risk;
pub mod tenant;
pub mod time_entry;
pub mod user;

pub use applicability_rule::Entity as ApplicabilityRule;
pub use approval_instance::Entity as ApprovalInstance;
pub use approval_route::Entity as ApprovalRoute;
pub use audit_event::Entity as AuditEvent;
pub use compliance_record::Entity as ComplianceRecord;
pub use control::Entity as Control;
pub use control_measure::Entity as ControlMeasure;
pub use document::Entity as Document;
pub use document_version::Entity as DocumentVersion;
pub use evidence::Entity as Evidence;
pub use evidence_link::Entity as EvidenceLink;
pub use notification::Entity as Notification;
pub use notification_rule::Entity as NotificationRule;
pub use organization::Entity as Organization;
pub use project::Entity as Project;
pub use project_task::Entity as ProjectTask;
pub use requirement::Entity as Requirement;
pub use requirement_applicability::Entity as RequirementApplicability;
pub use requirement_control::Entity as RequirementControl;
pub use risk::Entity as Risk;
pub use tenant::Entity as Tenant;
pub use time_entry::Entity as TimeEntry;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "compliance-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
