//! Migration to create the break_periods table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BreakPeriods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BreakPeriods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BreakPeriods::TimeEntryId).integer().not_null())
                    .col(ColumnDef::new(BreakPeriods::StartTime).time().not_null())
                    .col(ColumnDef::new(BreakPeriods::EndTime).time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_break_periods_time_entry_id")
                            .from(BreakPeriods::Table, BreakPeriods::TimeEntryId)
                            .to(TimeEntries::Table, TimeEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_break_periods_time_entry_id")
                    .table(BreakPeriods::Table)
                    .col(BreakPeriods::TimeEntryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_break_periods_time_entry_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BreakPeriods::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BreakPeriods {
    Table,
    Id,
    TimeEntryId,
    StartTime,
    EndTime,
}

#[derive(DeriveIden)]
enum TimeEntries {
    Table,
    Id,
}
