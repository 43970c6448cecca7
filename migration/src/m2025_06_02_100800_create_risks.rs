//! Migration to create the risks table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Risks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Risks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Risks::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Risks::OrganizationId).uuid().null())
                    .col(ColumnDef::new(Risks::Title).text().not_null())
                    .col(ColumnDef::new(Risks::Description).text().null())
                    .col(ColumnDef::new(Risks::Category).text().not_null())
                    .col(ColumnDef::new(Risks::Likelihood).integer().not_null())
                    .col(ColumnDef::new(Risks::Impact).integer().not_null())
                    .col(ColumnDef::new(Risks::Level).text().not_null())
                    .col(
                        ColumnDef::new(Risks::Status)
                            .text()
                            .not_null()
                            .default("identified"),
                    )
                    .col(ColumnDef::new(Risks::OwnerId).uuid().null())
                    .col(ColumnDef::new(Risks::TreatmentPlan).text().null())
                    .col(ColumnDef::new(Risks::ReviewDue).date().null())
                    .col(
                        ColumnDef::new(Risks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Risks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_risks_tenant_id")
                            .from(Risks::Table, Risks::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_risks_organization_id")
                            .from(Risks::Table, Risks::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_risks_tenant_level")
                    .table(Risks::Table)
                    .col(Risks::TenantId)
                    .col(Risks::Level)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_risks_tenant_level").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Risks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Risks {
    Table,
    Id,
    TenantId,
    OrganizationId,
    Title,
    Description,
    Category,
    Likelihood,
    Impact,
    Level,
    Status,
    OwnerId,
    TreatmentPlan,
    ReviewDue,
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
