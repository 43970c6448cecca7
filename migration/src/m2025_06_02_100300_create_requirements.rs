//! Migration to create the requirements and applicability_rules tables.
//!
//! Requirements with a NULL tenant_id form the shared regulatory catalog;
//! tenant-owned rows are custom requirements. Applicability rules hang off
//! a requirement and store their predicate lists as JSONB.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requirements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requirements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Requirements::TenantId).uuid().null())
                    .col(ColumnDef::new(Requirements::Code).text().not_null())
                    .col(ColumnDef::new(Requirements::Title).text().not_null())
                    .col(ColumnDef::new(Requirements::Description).text().null())
                    .col(ColumnDef::new(Requirements::Regulator).text().not_null())
                    .col(ColumnDef::new(Requirements::Category).text().not_null())
                    .col(
                        ColumnDef::new(Requirements::EffectiveFrom)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Requirements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Requirements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirements_tenant_id")
                            .from(Requirements::Table, Requirements::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Codes are unique within the catalog and within each tenant.
        manager
            .create_index(
                Index::create()
                    .name("idx_requirements_tenant_code")
                    .table(Requirements::Table)
                    .col(Requirements::TenantId)
                    .col(Requirements::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApplicabilityRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApplicabilityRules::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::RequirementId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::KiiCategories)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::PdnLevels)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::Sectors)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::MinEmployeeCount)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::MaxEmployeeCount)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::RequiresFinancial)
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApplicabilityRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applicability_rules_requirement_id")
                            .from(ApplicabilityRules::Table, ApplicabilityRules::RequirementId)
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_applicability_rules_requirement_id")
                    .table(ApplicabilityRules::Table)
                    .col(ApplicabilityRules::RequirementId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_applicability_rules_requirement_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ApplicabilityRules::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_requirements_tenant_code").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requirements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
    TenantId,
    Code,
    Title,
    Description,
    Regulator,
    Category,
    EffectiveFrom,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApplicabilityRules {
    Table,
    Id,
    RequirementId,
    KiiCategories,
    PdnLevels,
    Sectors,
    MinEmployeeCount,
    MaxEmployeeCount,
    RequiresFinancial,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
