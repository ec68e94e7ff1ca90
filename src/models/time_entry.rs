//! TimeEntry entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// A worked interval on a single calendar day
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "time_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub timesheet_id: i32,

    pub date: Date,
    pub in_time: Time,
    pub out_time: Time,

    pub project: Option<String>,
    pub note: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::timesheet::Entity",
        from = "Column::TimesheetId",
        to = "super::timesheet::Column::Id",
        on_delete = "Cascade"
    )]
    Timesheet,
    #[sea_orm(has_many = "super::break_period::Entity")]
    BreakPeriods,
}

impl Related<super::timesheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timesheet.def()
    }
}

impl Related<super::break_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BreakPeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
