//! AuditLog entity model
//!
//! Append-only record of timesheet lifecycle events.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub timesheet_id: Option<i32>,

    /// One of the [`AuditEvent`](super::AuditEvent) strings
    pub event: String,

    pub actor_id: Option<i32>,
    pub actor_email: String,
    /// Role of the actor when the event happened
    pub actor_role: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
