//! # Audit Log Repository
//!
//! Append-only. Rows are written on the same connection as the change they
//! describe so they commit or roll back together.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde_json::Value;

use crate::models::audit_log::{self, ActiveModel as AuditLogActiveModel, Entity as AuditLog};
use crate::models::AuditEvent;
use crate::policy::Actor;

pub struct AuditLogRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AuditLogRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        timesheet_id: i32,
        event: AuditEvent,
        actor: &Actor,
        details: Value,
    ) -> Result<audit_log::Model, DbErr> {
        AuditLogActiveModel {
            timesheet_id: Set(Some(timesheet_id)),
            event: Set(event.as_str().to_string()),
            actor_id: Set(Some(actor.id)),
            actor_email: Set(actor.email.clone()),
            actor_role: Set(actor.role.kind().as_str().to_string()),
            details: Set(Some(details)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    /// Events for one timesheet, oldest first.
    pub async fn for_timesheet(&self, timesheet_id: i32) -> Result<Vec<audit_log::Model>, DbErr> {
        AuditLog::find()
            .filter(audit_log::Column::TimesheetId.eq(timesheet_id))
            .order_by_asc(audit_log::Column::Id)
            .all(self.db)
            .await
    }
}
