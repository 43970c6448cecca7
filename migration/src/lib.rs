//! Database migrations for the Compliance API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_02_100000_create_tenants;
mod m2025_06_02_100100_create_users;
mod m2025_06_02_100200_create_organizations;
mod m2025_06_02_100300_create_requirements;
mod m2025_06_02_100400_create_requirement_applicability;
mod m2025_06_02_100500_create_compliance_records;
mod m2025_06_02_100600_create_controls;
mod m2025_06_02_100700_create_evidence;
mod m2025_06_02_100800_create_risks;
mod m2025_06_02_100900_create_documents;
mod m2025_06_09_110000_create_approvals;
mod m2025_06_09_110100_create_notifications;
mod m2025_06_16_120000_create_audit_events;
mod m2025_06_16_120100_create_projects;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_02_100000_create_tenants::Migration),
            Box::new(m2025_06_02_100100_create_users::Migration),
            Box::new(m2025_06_02_100200_create_organizations::Migration),
            Box::new(m2025_06_02_100300_create_requirements::Migration),
            Box::new(m2025_06_02_100400_create_requirement_applicability::Migration),
            Box::new(m2025_06_02_100500_create_compliance_records::Migration),
            Box::new(m2025_06_02_100600_create_controls::Migration),
            Box::new(m2025_06_02_100700_create_evidence::Migration),
            Box::new(m2025_06_02_100800_create_risks::Migration),
            Box::new(m2025_06_02_100900_create_documents::Migration),
            Box::new(m2025_06_09_110000_create_approvals::Migration),
            Box::new(m2025_06_09_110100_create_notifications::Migration),
            Box::new(m2025_06_16_120000_create_audit_events::Migration),
            Box::new(m2025_06_16_120100_create_projects::Migration),
        ]
    }
}
