//! Migration to create the approval_routes and approval_instances tables.
//!
//! Route steps and instance decision history are stored as JSONB arrays.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApprovalRoutes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalRoutes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApprovalRoutes::TenantId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalRoutes::Name).text().not_null())
                    .col(
                        ColumnDef::new(ApprovalRoutes::Steps)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalRoutes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApprovalRoutes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_routes_tenant_id")
                            .from(ApprovalRoutes::Table, ApprovalRoutes::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approval_routes_tenant_name")
                    .table(ApprovalRoutes::Table)
                    .col(ApprovalRoutes::TenantId)
                    .col(ApprovalRoutes::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalInstances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalInstances::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::TenantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalInstances::RouteId).uuid().not_null())
                    .col(
                        ColumnDef::new(ApprovalInstances::TargetType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::TargetId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::CurrentStep)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::Decisions)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalInstances::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(ApprovalInstances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApprovalInstances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_instances_route_id")
                            .from(ApprovalInstances::Table, ApprovalInstances::RouteId)
                            .to(ApprovalRoutes::Table, ApprovalRoutes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approval_instances_target")
                    .table(ApprovalInstances::Table)
                    .col(ApprovalInstances::TenantId)
                    .col(ApprovalInstances::TargetType)
                    .col(ApprovalInstances::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_approval_instances_target").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalInstances::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_approval_routes_tenant_name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalRoutes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApprovalRoutes {
    Table,
    Id,
    TenantId,
    Name,
    Steps,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApprovalInstances {
    Table,
    Id,
    TenantId,
    RouteId,
    TargetType,
    TargetId,
    CurrentStep,
    Status,
    Decisions,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
