//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities, providing a clean API for data access
//! with tenant-aware methods.

pub mod applicability;
pub mod approval;
pub mod audit_event;
pub mod compliance_record;
pub mod control;
pub mod document;
pub mod evidence;
pub mod notification;
pub mod organization;
pub mod project;
pub mod requirement;
pub mod risk;
pub mod tenant;
pub mod user;

pub use applicability::ApplicabilityRepository;
pub use approval::ApprovalRepository;
pub use audit_event::AuditEventRepository;
pub use compliance_record::ComplianceRecordRepository;
pub use control::ControlRepository;
pub use document::DocumentRepository;
pub use evidence::EvidenceRepository;
pub use notification::NotificationRepository;
pub use organization::OrganizationRepository;
pub use project::ProjectRepository;
pub use requirement::RequirementRepository;
pub use risk::RiskRepository;
pub use tenant::{CreateTenantRequest, TenantRepository};
pub use user::UserRepository;
