//! Migration to create the audit_logs table.
//!
//! Audit rows record who moved a timesheet through its lifecycle. Rows outlive
//! the timesheet and the actor, so both references are nullable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::TimesheetId).integer().null())
                    .col(ColumnDef::new(AuditLogs::Event).string_len(64).not_null())
                    .col(ColumnDef::new(AuditLogs::ActorId).integer().null())
                    .col(ColumnDef::new(AuditLogs::ActorEmail).string_len(255).not_null())
                    .col(ColumnDef::new(AuditLogs::ActorRole).string_len(32).not_null())
                    .col(ColumnDef::new(AuditLogs::Details).json_binary().null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_logs_timesheet_id")
                            .from(AuditLogs::Table, AuditLogs::TimesheetId)
                            .to(Timesheets::Table, Timesheets::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_logs_actor_id")
                            .from(AuditLogs::Table, AuditLogs::ActorId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_timesheet_id")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::TimesheetId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_audit_logs_timesheet_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    TimesheetId,
    Event,
    ActorId,
    ActorEmail,
    ActorRole,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Timesheets {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}
