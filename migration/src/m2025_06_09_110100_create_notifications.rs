//! Migration to create the notification_rules and notifications tables.
//!
//! The unique index over (rule_id, target_type, target_id, due_at) is the
//! at-most-once guard for the sweep: re-running a sweep over the same window
//! conflicts instead of duplicating rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationRules::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::TenantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationRules::Name).text().not_null())
                    .col(
                        ColumnDef::new(NotificationRules::EventKind)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::DaysBefore)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::Channel)
                            .text()
                            .not_null()
                            .default("in_app"),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(NotificationRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_rules_tenant_id")
                            .from(NotificationRules::Table, NotificationRules::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_rules_tenant_name")
                    .table(NotificationRules::Table)
                    .col(NotificationRules::TenantId)
                    .col(NotificationRules::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::RuleId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::TargetType).text().not_null())
                    .col(ColumnDef::new(Notifications::TargetId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::DueAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_rule_id")
                            .from(Notifications::Table, Notifications::RuleId)
                            .to(NotificationRules::Table, NotificationRules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_dedup")
                    .table(Notifications::Table)
                    .col(Notifications::RuleId)
                    .col(Notifications::TargetType)
                    .col(Notifications::TargetId)
                    .col(Notifications::DueAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_tenant_status")
                    .table(Notifications::Table)
                    .col(Notifications::TenantId)
                    .col(Notifications::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_notifications_dedup").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_notifications_tenant_status")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_notification_rules_tenant_name")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(NotificationRules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NotificationRules {
    Table,
    Id,
    TenantId,
    Name,
    EventKind,
    DaysBefore,
    Channel,
    Enabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    TenantId,
    RuleId,
    TargetType,
    TargetId,
    Message,
    DueAt,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
