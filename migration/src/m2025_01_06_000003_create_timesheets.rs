//! Migration to create the timesheets table.
//!
//! A timesheet covers one week of work for one employee and carries the
//! approval workflow state.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Timesheets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Timesheets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Timesheets::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Timesheets::WeekStart).date().not_null())
                    .col(
                        ColumnDef::new(Timesheets::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Timesheets::ManagerEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Timesheets::Project).string_len(255).null())
                    .col(ColumnDef::new(Timesheets::Comment).text().null())
                    .col(ColumnDef::new(Timesheets::ManagerComment).text().null())
                    .col(ColumnDef::new(Timesheets::ApprovedBy).integer().null())
                    .col(
                        ColumnDef::new(Timesheets::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Timesheets::SubmittedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Timesheets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Timesheets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_timesheets_employee_id")
                            .from(Timesheets::Table, Timesheets::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_timesheets_approved_by")
                            .from(Timesheets::Table, Timesheets::ApprovedBy)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_timesheets_employee_week")
                    .table(Timesheets::Table)
                    .col(Timesheets::EmployeeId)
                    .col(Timesheets::WeekStart)
                    .to_owned(),
            )
            .await?;

        // Managers list their approval queue by address.
        manager
            .create_index(
                Index::create()
                    .name("idx_timesheets_manager_status")
                    .table(Timesheets::Table)
                    .col(Timesheets::ManagerEmail)
                    .col(Timesheets::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_timesheets_manager_status").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_timesheets_employee_week").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Timesheets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Timesheets {
    Table,
    Id,
    EmployeeId,
    WeekStart,
    Status,
    ManagerEmail,
    Project,
    Comment,
    ManagerComment,
    ApprovedBy,
    ApprovedAt,
    SubmittedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}
