//! TimeOff entity model
//!
//! Leave requests. The request type is stored in the `kind` column and
//! exposed as `type` on the wire.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::{TimeOffKind, TimeOffStatus, UnknownVariant};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "time_off")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub employee_id: i32,

    pub start_date: Date,
    pub end_date: Date,

    pub kind: String,
    pub status: String,

    pub manager_email: String,
    pub comment: Option<String>,
    pub manager_comment: Option<String>,

    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn status(&self) -> Result<TimeOffStatus, UnknownVariant> {
        self.status.parse()
    }

    pub fn kind(&self) -> Result<TimeOffKind, UnknownVariant> {
        self.kind.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
