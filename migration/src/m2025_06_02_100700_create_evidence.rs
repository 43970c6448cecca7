//! Migration to create the evidence and evidence_links tables.
//!
//! Evidence rows carry metadata and a content hash only; binary payloads
//! live outside this service. Links attach evidence to compliance records
//! or control measures through a polymorphic (target_type, target_id) pair.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Evidence::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Evidence::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Evidence::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Evidence::Title).text().not_null())
                    .col(ColumnDef::new(Evidence::Description).text().null())
                    .col(ColumnDef::new(Evidence::Kind).text().not_null())
                    .col(ColumnDef::new(Evidence::FileName).text().null())
                    .col(ColumnDef::new(Evidence::ContentHash).text().null())
                    .col(ColumnDef::new(Evidence::ValidUntil).date().null())
                    .col(ColumnDef::new(Evidence::UploadedBy).uuid().null())
                    .col(
                        ColumnDef::new(Evidence::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Evidence::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evidence_tenant_id")
                            .from(Evidence::Table, Evidence::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evidence_tenant_id")
                    .table(Evidence::Table)
                    .col(Evidence::TenantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EvidenceLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EvidenceLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EvidenceLinks::TenantId).uuid().not_null())
                    .col(ColumnDef::new(EvidenceLinks::EvidenceId).uuid().not_null())
                    .col(ColumnDef::new(EvidenceLinks::TargetType).text().not_null())
                    .col(ColumnDef::new(EvidenceLinks::TargetId).uuid().not_null())
                    .col(
                        ColumnDef::new(EvidenceLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evidence_links_evidence_id")
                            .from(EvidenceLinks::Table, EvidenceLinks::EvidenceId)
                            .to(Evidence::Table, Evidence::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evidence_links_unique")
                    .table(EvidenceLinks::Table)
                    .col(EvidenceLinks::TenantId)
                    .col(EvidenceLinks::EvidenceId)
                    .col(EvidenceLinks::TargetType)
                    .col(EvidenceLinks::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_evidence_links_unique").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EvidenceLinks::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_evidence_tenant_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Evidence::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Evidence {
    Table,
    Id,
    TenantId,
    Title,
    Description,
    Kind,
    FileName,
    ContentHash,
    ValidUntil,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EvidenceLinks {
    Table,
    Id,
    TenantId,
    EvidenceId,
    TargetType,
    TargetId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
