//! # Time-Off Repository

use chrono::{NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::models::employee::{self, Entity as Employee};
use crate::models::time_off::{self, ActiveModel as TimeOffActiveModel, Entity as TimeOff};
use crate::models::{TimeOffKind, TimeOffStatus};
use crate::policy::Scope;

#[derive(Debug, Clone)]
pub struct NewTimeOff {
    pub employee_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: TimeOffKind,
    pub manager_email: String,
    pub comment: Option<String>,
}

pub struct TimeOffRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TimeOffRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<time_off::Model>, DbErr> {
        TimeOff::find_by_id(id).one(self.db).await
    }

    pub async fn find_with_owner(
        &self,
        id: i32,
    ) -> Result<Option<(time_off::Model, employee::Model)>, DbErr> {
        let row = TimeOff::find_by_id(id)
            .find_also_related(Employee)
            .one(self.db)
            .await?;
        Ok(row.and_then(|(request, owner)| owner.map(|owner| (request, owner))))
    }

    /// Requests visible under `scope`, most recent start date first.
    pub async fn list(&self, scope: Scope) -> Result<Vec<time_off::Model>, DbErr> {
        let query = TimeOff::find()
            .order_by_desc(time_off::Column::StartDate)
            .order_by_desc(time_off::Column::Id);
        let query = match scope {
            Scope::All => query,
            Scope::Client(client_id) => query
                .inner_join(Employee)
                .filter(employee::Column::ClientId.eq(client_id)),
            Scope::Owner(employee_id) => query.filter(time_off::Column::EmployeeId.eq(employee_id)),
        };
        query.all(self.db).await
    }

    /// Inserts a request in `pending`.
    pub async fn create(&self, request: NewTimeOff) -> Result<time_off::Model, DbErr> {
        let now = Utc::now();
        TimeOffActiveModel {
            employee_id: Set(request.employee_id),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            kind: Set(request.kind.as_str().to_string()),
            status: Set(TimeOffStatus::Pending.as_str().to_string()),
            manager_email: Set(request.manager_email),
            comment: Set(request.comment),
            manager_comment: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn save(&self, mut active: TimeOffActiveModel) -> Result<time_off::Model, DbErr> {
        active.updated_at = Set(Utc::now().into());
        active.update(self.db).await
    }

    /// Bumps `updated_at`, and moves the request to `target` when given, only
    /// while it is still pending. Returns `false` otherwise.
    pub async fn guard_pending(
        &self,
        id: i32,
        target: Option<TimeOffStatus>,
    ) -> Result<bool, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut update = TimeOff::update_many()
            .col_expr(time_off::Column::UpdatedAt, Expr::value(now))
            .filter(time_off::Column::Id.eq(id))
            .filter(time_off::Column::Status.eq(TimeOffStatus::Pending.as_str()));
        if let Some(target) = target {
            update = update.col_expr(time_off::Column::Status, Expr::value(target.as_str()));
        }
        Ok(update.exec(self.db).await?.rows_affected == 1)
    }

    pub async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        Ok(TimeOff::delete_by_id(id).exec(self.db).await?.rows_affected)
    }

    /// `(status, count)` pairs for one employee.
    pub async fn status_counts(&self, employee_id: i32) -> Result<Vec<(String, i64)>, DbErr> {
        TimeOff::find()
            .select_only()
            .column(time_off::Column::Status)
            .column_as(Expr::col(time_off::Column::Id).count(), "count")
            .filter(time_off::Column::EmployeeId.eq(employee_id))
            .group_by(time_off::Column::Status)
            .into_tuple()
            .all(self.db)
            .await
    }

    /// Pending requests of `client_id` addressed to `manager_email`.
    pub async fn count_awaiting(&self, manager_email: &str, client_id: i32) -> Result<u64, DbErr> {
        TimeOff::find()
            .inner_join(Employee)
            .filter(employee::Column::ClientId.eq(client_id))
            .filter(time_off::Column::ManagerEmail.eq(manager_email))
            .filter(time_off::Column::Status.eq(TimeOffStatus::Pending.as_str()))
            .count(self.db)
            .await
    }
}
