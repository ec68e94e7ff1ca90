//! # Employee Repository
//!
//! Employees are looked up by id or by their normalised email. Deleting an
//! employee removes everything they own in one transaction.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::models::employee::{self, ActiveModel as EmployeeActiveModel, Entity as Employee};
use crate::models::{
    AuditLog, BreakPeriod, RoleKind, TimeEntry, TimeOff, Timesheet, audit_log, break_period,
    time_entry, time_off, timesheet,
};
use crate::policy::Scope;

/// Canonical form of an address for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleKind,
    pub client_id: Option<i32>,
    pub is_active: bool,
}

/// Partial update. `client_id` is always written; callers merge it first.
#[derive(Debug, Clone)]
pub struct EmployeeChanges {
    pub full_name: Option<String>,
    pub role: RoleKind,
    pub client_id: Option<i32>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

pub struct EmployeeRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> EmployeeRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<employee::Model>, DbErr> {
        Employee::find_by_id(id).one(self.db).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<employee::Model>, DbErr> {
        Employee::find()
            .filter(employee::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
    }

    pub async fn list(&self, scope: Scope) -> Result<Vec<employee::Model>, DbErr> {
        let query = Employee::find().order_by_asc(employee::Column::FullName);
        let query = match scope {
            Scope::All => query,
            Scope::Client(client_id) => query.filter(employee::Column::ClientId.eq(client_id)),
            Scope::Owner(employee_id) => query.filter(employee::Column::Id.eq(employee_id)),
        };
        query.all(self.db).await
    }

    pub async fn create(&self, new_employee: NewEmployee) -> Result<employee::Model, DbErr> {
        let now = Utc::now();
        EmployeeActiveModel {
            full_name: Set(new_employee.full_name),
            email: Set(normalize_email(&new_employee.email)),
            password_hash: Set(new_employee.password_hash),
            role: Set(new_employee.role.as_str().to_string()),
            client_id: Set(new_employee.client_id),
            is_active: Set(new_employee.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn update(
        &self,
        existing: employee::Model,
        changes: EmployeeChanges,
    ) -> Result<employee::Model, DbErr> {
        let mut active = existing.into_active_model();
        if let Some(full_name) = changes.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        active.role = Set(changes.role.as_str().to_string());
        active.client_id = Set(changes.client_id);
        active.updated_at = Set(Utc::now().into());
        active.update(self.db).await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Employee::find().count(self.db).await
    }

    pub async fn count_in_client(&self, client_id: i32) -> Result<u64, DbErr> {
        Employee::find()
            .filter(employee::Column::ClientId.eq(client_id))
            .count(self.db)
            .await
    }

    pub async fn count_with_role(&self, role: RoleKind) -> Result<u64, DbErr> {
        Employee::find()
            .filter(employee::Column::Role.eq(role.as_str()))
            .count(self.db)
            .await
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> EmployeeRepository<'a, C> {
    /// Deletes the employee with their timesheets, entries, breaks and leave
    /// requests. Approvals they recorded on other records are cleared.
    pub async fn delete_cascade(&self, id: i32) -> Result<u64, DbErr> {
        let txn = self.db.begin().await?;

        let timesheet_ids: Vec<i32> = Timesheet::find()
            .select_only()
            .column(timesheet::Column::Id)
            .filter(timesheet::Column::EmployeeId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !timesheet_ids.is_empty() {
            let entry_ids: Vec<i32> = TimeEntry::find()
                .select_only()
                .column(time_entry::Column::Id)
                .filter(time_entry::Column::TimesheetId.is_in(timesheet_ids.clone()))
                .into_tuple()
                .all(&txn)
                .await?;

            AuditLog::update_many()
                .col_expr(audit_log::Column::TimesheetId, Expr::value(Option::<i32>::None))
                .filter(audit_log::Column::TimesheetId.is_in(timesheet_ids.clone()))
                .exec(&txn)
                .await?;
            BreakPeriod::delete_many()
                .filter(break_period::Column::TimeEntryId.is_in(entry_ids))
                .exec(&txn)
                .await?;
            TimeEntry::delete_many()
                .filter(time_entry::Column::TimesheetId.is_in(timesheet_ids))
                .exec(&txn)
                .await?;
            Timesheet::delete_many()
                .filter(timesheet::Column::EmployeeId.eq(id))
                .exec(&txn)
                .await?;
        }

        TimeOff::delete_many()
            .filter(time_off::Column::EmployeeId.eq(id))
            .exec(&txn)
            .await?;

        Timesheet::update_many()
            .col_expr(timesheet::Column::ApprovedBy, Expr::value(Option::<i32>::None))
            .filter(timesheet::Column::ApprovedBy.eq(id))
            .exec(&txn)
            .await?;
        TimeOff::update_many()
            .col_expr(time_off::Column::ApprovedBy, Expr::value(Option::<i32>::None))
            .filter(time_off::Column::ApprovedBy.eq(id))
            .exec(&txn)
            .await?;

        AuditLog::update_many()
            .col_expr(audit_log::Column::ActorId, Expr::value(Option::<i32>::None))
            .filter(audit_log::Column::ActorId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = Employee::delete_by_id(id).exec(&txn).await?.rows_affected;
        txn.commit().await?;
        Ok(deleted)
    }
}
