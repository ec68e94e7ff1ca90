//! # Timesheet Repository
//!
//! Timesheet rows, their owner lookup and the aggregate counts shown on the
//! dashboard. Entry and break rows live in [`super::time_entry`].

use chrono::{NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::time_entry::TimeEntryRepository;
use crate::models::employee::{self, Entity as Employee};
use crate::models::timesheet::{self, ActiveModel as TimesheetActiveModel, Entity as Timesheet};
use crate::models::{AuditLog, TimesheetStatus, audit_log};
use crate::policy::Scope;

#[derive(Debug, Clone)]
pub struct NewTimesheet {
    pub employee_id: i32,
    pub week_start: NaiveDate,
    pub manager_email: String,
    pub project: Option<String>,
    pub comment: Option<String>,
}

pub struct TimesheetRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TimesheetRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<timesheet::Model>, DbErr> {
        Timesheet::find_by_id(id).one(self.db).await
    }

    /// The timesheet together with the employee who owns it.
    pub async fn find_with_owner(
        &self,
        id: i32,
    ) -> Result<Option<(timesheet::Model, employee::Model)>, DbErr> {
        let row = Timesheet::find_by_id(id)
            .find_also_related(Employee)
            .one(self.db)
            .await?;
        Ok(row.and_then(|(sheet, owner)| owner.map(|owner| (sheet, owner))))
    }

    /// Timesheets visible under `scope`, newest week first.
    pub async fn list(&self, scope: Scope) -> Result<Vec<timesheet::Model>, DbErr> {
        let query = Timesheet::find()
            .order_by_desc(timesheet::Column::WeekStart)
            .order_by_desc(timesheet::Column::Id);
        let query = match scope {
            Scope::All => query,
            Scope::Client(client_id) => query
                .inner_join(Employee)
                .filter(employee::Column::ClientId.eq(client_id)),
            Scope::Owner(employee_id) => query.filter(timesheet::Column::EmployeeId.eq(employee_id)),
        };
        query.all(self.db).await
    }

    /// Inserts a new timesheet in `draft`.
    pub async fn create(&self, new_sheet: NewTimesheet) -> Result<timesheet::Model, DbErr> {
        let now = Utc::now();
        TimesheetActiveModel {
            employee_id: Set(new_sheet.employee_id),
            week_start: Set(new_sheet.week_start),
            status: Set(TimesheetStatus::Draft.as_str().to_string()),
            manager_email: Set(new_sheet.manager_email),
            project: Set(new_sheet.project),
            comment: Set(new_sheet.comment),
            manager_comment: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            submitted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Writes the changed columns of `active` and bumps `updated_at`.
    pub async fn save(&self, mut active: TimesheetActiveModel) -> Result<timesheet::Model, DbErr> {
        active.updated_at = Set(Utc::now().into());
        active.update(self.db).await
    }

    /// Bumps `updated_at`, and moves the row to `target` when given, only
    /// while its stored status is one of `from`. Returns `false` when the row
    /// is gone or its status has moved on.
    pub async fn guard_status(
        &self,
        id: i32,
        from: &[TimesheetStatus],
        target: Option<TimesheetStatus>,
    ) -> Result<bool, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut update = Timesheet::update_many()
            .col_expr(timesheet::Column::UpdatedAt, Expr::value(now))
            .filter(timesheet::Column::Id.eq(id))
            .filter(timesheet::Column::Status.is_in(from.iter().map(TimesheetStatus::as_str)));
        if let Some(target) = target {
            update = update.col_expr(timesheet::Column::Status, Expr::value(target.as_str()));
        }
        Ok(update.exec(self.db).await?.rows_affected == 1)
    }

    /// Removes the timesheet and its entries. Audit rows are kept with the
    /// reference cleared.
    pub async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        TimeEntryRepository::new(self.db)
            .delete_for_timesheet(id)
            .await?;
        AuditLog::update_many()
            .col_expr(audit_log::Column::TimesheetId, Expr::value(Option::<i32>::None))
            .filter(audit_log::Column::TimesheetId.eq(id))
            .exec(self.db)
            .await?;
        Ok(Timesheet::delete_by_id(id).exec(self.db).await?.rows_affected)
    }

    /// `(status, count)` pairs for one employee.
    pub async fn status_counts(&self, employee_id: i32) -> Result<Vec<(String, i64)>, DbErr> {
        Timesheet::find()
            .select_only()
            .column(timesheet::Column::Status)
            .column_as(Expr::col(timesheet::Column::Id).count(), "count")
            .filter(timesheet::Column::EmployeeId.eq(employee_id))
            .group_by(timesheet::Column::Status)
            .into_tuple()
            .all(self.db)
            .await
    }

    /// Timesheets of `client_id` waiting for a decision from `manager_email`.
    pub async fn count_awaiting(&self, manager_email: &str, client_id: i32) -> Result<u64, DbErr> {
        Timesheet::find()
            .inner_join(Employee)
            .filter(employee::Column::ClientId.eq(client_id))
            .filter(timesheet::Column::ManagerEmail.eq(manager_email))
            .filter(timesheet::Column::Status.is_in([
                TimesheetStatus::Submitted.as_str(),
                TimesheetStatus::Pending.as_str(),
            ]))
            .count(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Timesheet::find().count(self.db).await
    }
}
