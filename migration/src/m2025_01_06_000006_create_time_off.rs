//! Migration to create the time_off table holding leave requests.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TimeOff::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TimeOff::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TimeOff::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(TimeOff::StartDate).date().not_null())
                    .col(ColumnDef::new(TimeOff::EndDate).date().not_null())
                    .col(ColumnDef::new(TimeOff::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(TimeOff::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(TimeOff::ManagerEmail).string_len(255).not_null())
                    .col(ColumnDef::new(TimeOff::Comment).text().null())
                    .col(ColumnDef::new(TimeOff::ManagerComment).text().null())
                    .col(ColumnDef::new(TimeOff::ApprovedBy).integer().null())
                    .col(
                        ColumnDef::new(TimeOff::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TimeOff::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TimeOff::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_off_employee_id")
                            .from(TimeOff::Table, TimeOff::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_off_approved_by")
                            .from(TimeOff::Table, TimeOff::ApprovedBy)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_time_off_employee_id")
                    .table(TimeOff::Table)
                    .col(TimeOff::EmployeeId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_time_off_employee_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimeOff::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TimeOff {
    Table,
    Id,
    EmployeeId,
    StartDate,
    EndDate,
    Kind,
    Status,
    ManagerEmail,
    Comment,
    ManagerComment,
    ApprovedBy,
    ApprovedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}
