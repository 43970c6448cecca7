//! Migration to create the projects, project_tasks and time_entries tables
//! for the project-management/time-tracking module.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Projects::Name).text().not_null())
                    .col(ColumnDef::new(Projects::Description).text().null())
                    .col(
                        ColumnDef::new(Projects::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Projects::LeadId).uuid().null())
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Projects::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_tenant_id")
                            .from(Projects::Table, Projects::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectTasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectTasks::TenantId).uuid().not_null())
                    .col(ColumnDef::new(ProjectTasks::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProjectTasks::Title).text().not_null())
                    .col(ColumnDef::new(ProjectTasks::Description).text().null())
                    .col(
                        ColumnDef::new(ProjectTasks::Status)
                            .text()
                            .not_null()
                            .default("todo"),
                    )
                    .col(ColumnDef::new(ProjectTasks::AssigneeId).uuid().null())
                    .col(ColumnDef::new(ProjectTasks::DueDate).date().null())
                    .col(
                        ColumnDef::new(ProjectTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProjectTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_tasks_project_id")
                            .from(ProjectTasks::Table, ProjectTasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_tasks_tenant_project")
                    .table(ProjectTasks::Table)
                    .col(ProjectTasks::TenantId)
                    .col(ProjectTasks::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TimeEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TimeEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TimeEntries::TenantId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::TaskId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::UserId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::SpentOn).date().not_null())
                    .col(ColumnDef::new(TimeEntries::Minutes).integer().not_null())
                    .col(ColumnDef::new(TimeEntries::Note).text().null())
                    .col(
                        ColumnDef::new(TimeEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TimeEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_entries_task_id")
                            .from(TimeEntries::Table, TimeEntries::TaskId)
                            .to(ProjectTasks::Table, ProjectTasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_time_entries_tenant_task")
                    .table(TimeEntries::Table)
                    .col(TimeEntries::TenantId)
                    .col(TimeEntries::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_time_entries_tenant_task").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimeEntries::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_project_tasks_tenant_project")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    TenantId,
    Name,
    Description,
    Status,
    LeadId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProjectTasks {
    Table,
    Id,
    TenantId,
    ProjectId,
    Title,
    Description,
    Status,
    AssigneeId,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TimeEntries {
    Table,
    Id,
    TenantId,
    TaskId,
    UserId,
    SpentOn,
    Minutes,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
