//! BreakPeriod entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// A pause inside a time entry; always contained in the parent's bounds
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "break_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub time_entry_id: i32,

    pub start_time: Time,
    pub end_time: Time,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::time_entry::Entity",
        from = "Column::TimeEntryId",
        to = "super::time_entry::Column::Id",
        on_delete = "Cascade"
    )]
    TimeEntry,
}

impl Related<super::time_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
