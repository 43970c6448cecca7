//! Migration to create the controls, requirement_controls and
//! control_measures tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Controls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Controls::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Controls::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Controls::Code).text().not_null())
                    .col(ColumnDef::new(Controls::Title).text().not_null())
                    .col(ColumnDef::new(Controls::Description).text().null())
                    .col(ColumnDef::new(Controls::ControlType).text().not_null())
                    .col(ColumnDef::new(Controls::OwnerId).uuid().null())
                    .col(
                        ColumnDef::new(Controls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Controls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_controls_tenant_id")
                            .from(Controls::Table, Controls::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_controls_tenant_code")
                    .table(Controls::Table)
                    .col(Controls::TenantId)
                    .col(Controls::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequirementControls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequirementControls::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequirementControls::TenantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementControls::RequirementId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementControls::ControlId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementControls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirement_controls_requirement_id")
                            .from(RequirementControls::Table, RequirementControls::RequirementId)
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirement_controls_control_id")
                            .from(RequirementControls::Table, RequirementControls::ControlId)
                            .to(Controls::Table, Controls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requirement_controls_pair")
                    .table(RequirementControls::Table)
                    .col(RequirementControls::TenantId)
                    .col(RequirementControls::RequirementId)
                    .col(RequirementControls::ControlId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ControlMeasures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ControlMeasures::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ControlMeasures::TenantId).uuid().not_null())
                    .col(ColumnDef::new(ControlMeasures::ControlId).uuid().not_null())
                    .col(ColumnDef::new(ControlMeasures::Title).text().not_null())
                    .col(ColumnDef::new(ControlMeasures::Description).text().null())
                    .col(
                        ColumnDef::new(ControlMeasures::Periodicity)
                            .text()
                            .not_null()
                            .default("once"),
                    )
                    .col(
                        ColumnDef::new(ControlMeasures::Status)
                            .text()
                            .not_null()
                            .default("planned"),
                    )
                    .col(ColumnDef::new(ControlMeasures::DueDate).date().null())
                    .col(
                        ColumnDef::new(ControlMeasures::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ControlMeasures::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ControlMeasures::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_control_measures_control_id")
                            .from(ControlMeasures::Table, ControlMeasures::ControlId)
                            .to(Controls::Table, Controls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_control_measures_tenant_control")
                    .table(ControlMeasures::Table)
                    .col(ControlMeasures::TenantId)
                    .col(ControlMeasures::ControlId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_control_measures_tenant_control")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ControlMeasures::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_requirement_controls_pair").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RequirementControls::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_controls_tenant_code").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Controls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Controls {
    Table,
    Id,
    TenantId,
    Code,
    Title,
    Description,
    ControlType,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RequirementControls {
    Table,
    Id,
    TenantId,
    RequirementId,
    ControlId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ControlMeasures {
    Table,
    Id,
    TenantId,
    ControlId,
    Title,
    Description,
    Periodicity,
    Status,
    DueDate,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
}
