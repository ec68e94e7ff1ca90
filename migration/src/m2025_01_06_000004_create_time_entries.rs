//! Migration to create the time_entries table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TimeEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TimeEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TimeEntries::TimesheetId).integer().not_null())
                    .col(ColumnDef::new(TimeEntries::Date).date().not_null())
                    .col(ColumnDef::new(TimeEntries::InTime).time().not_null())
                    .col(ColumnDef::new(TimeEntries::OutTime).time().not_null())
                    .col(ColumnDef::new(TimeEntries::Project).string_len(255).null())
                    .col(ColumnDef::new(TimeEntries::Note).text().null())
                    .col(
                        ColumnDef::new(TimeEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_entries_timesheet_id")
                            .from(TimeEntries::Table, TimeEntries::TimesheetId)
                            .to(Timesheets::Table, Timesheets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_time_entries_timesheet_date")
                    .table(TimeEntries::Table)
                    .col(TimeEntries::TimesheetId)
                    .col(TimeEntries::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_time_entries_timesheet_date").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimeEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TimeEntries {
    Table,
    Id,
    TimesheetId,
    Date,
    InTime,
    OutTime,
    Project,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Timesheets {
    Table,
    Id,
}
