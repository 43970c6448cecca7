//! Migration to create the requirement_applicability mapping table.
//!
//! One row per (tenant, requirement, organization) pair with a source tag
//! recording whether the mapping came from the rule engine or a manual
//! override.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequirementApplicability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequirementApplicability::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::TenantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::RequirementId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::Source)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::MatchedRuleId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RequirementApplicability::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirement_applicability_tenant_id")
                            .from(
                                RequirementApplicability::Table,
                                RequirementApplicability::TenantId,
                            )
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirement_applicability_requirement_id")
                            .from(
                                RequirementApplicability::Table,
                                RequirementApplicability::RequirementId,
                            )
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirement_applicability_organization_id")
                            .from(
                                RequirementApplicability::Table,
                                RequirementApplicability::OrganizationId,
                            )
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requirement_applicability_pair")
                    .table(RequirementApplicability::Table)
                    .col(RequirementApplicability::TenantId)
                    .col(RequirementApplicability::RequirementId)
                    .col(RequirementApplicability::OrganizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requirement_applicability_tenant_id")
                    .table(RequirementApplicability::Table)
                    .col(RequirementApplicability::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_requirement_applicability_pair")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_requirement_applicability_tenant_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(RequirementApplicability::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum RequirementApplicability {
    Table,
    Id,
    TenantId,
    RequirementId,
    OrganizationId,
    Source,
    MatchedRuleId,
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

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}
