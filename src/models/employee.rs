//! Employee entity model
//!
//! Employees are the authenticated actors. `role` holds one of the
//! [`RoleKind`](super::RoleKind) strings; `client_id` is set for every role
//! except `dew_admin`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::{RoleKind, UnknownVariant};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub full_name: String,

    /// Login identifier, unique across the organisation
    #[sea_orm(unique)]
    pub email: String,

    /// Salted digest produced by `credentials::hash_password`
    pub password_hash: String,

    pub client_id: Option<i32>,

    pub role: String,

    /// Inactive accounts cannot authenticate
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn role_kind(&self) -> Result<RoleKind, UnknownVariant> {
        self.role.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::timesheet::Entity")]
    Timesheets,
    #[sea_orm(has_many = "super::time_off::Entity")]
    TimeOff,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::timesheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timesheets.def()
    }
}

impl Related<super::time_off::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeOff.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
