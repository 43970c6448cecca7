//! Migration to create the compliance_records table.
//!
//! One row tracks one organization's status against one requirement, moving
//! through the fixed review workflow.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComplianceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ComplianceRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::TenantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::RequirementId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::Status)
                            .text()
                            .not_null()
                            .default("not_started"),
                    )
                    .col(ColumnDef::new(ComplianceRecords::AssigneeId).uuid().null())
                    .col(ColumnDef::new(ComplianceRecords::DueDate).date().null())
                    .col(ColumnDef::new(ComplianceRecords::Notes).text().null())
                    .col(ColumnDef::new(ComplianceRecords::ReviewedBy).uuid().null())
                    .col(
                        ColumnDef::new(ComplianceRecords::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ComplianceRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_compliance_records_tenant_id")
                            .from(ComplianceRecords::Table, ComplianceRecords::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_compliance_records_organization_id")
                            .from(ComplianceRecords::Table, ComplianceRecords::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_compliance_records_requirement_id")
                            .from(ComplianceRecords::Table, ComplianceRecords::RequirementId)
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_compliance_records_pair")
                    .table(ComplianceRecords::Table)
                    .col(ComplianceRecords::TenantId)
                    .col(ComplianceRecords::OrganizationId)
                    .col(ComplianceRecords::RequirementId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_compliance_records_tenant_status")
                    .table(ComplianceRecords::Table)
                    .col(ComplianceRecords::TenantId)
                    .col(ComplianceRecords::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_compliance_records_pair").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_compliance_records_tenant_status")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ComplianceRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ComplianceRecords {
    Table,
    Id,
    TenantId,
    OrganizationId,
    RequirementId,
    Status,
    AssigneeId,
    DueDate,
    Notes,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
}
