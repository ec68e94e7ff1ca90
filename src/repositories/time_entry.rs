//! # Time Entry Repository
//!
//! Entries are always read together with their breaks. Inserts write the
//! entry and its breaks through the same connection, so running them on a
//! transaction makes the pair all-or-nothing.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::intervals::{BreakSpan, EntryPayload, WorkInterval};
use crate::models::break_period::{self, ActiveModel as BreakActiveModel, Entity as BreakPeriod};
use crate::models::time_entry::{self, ActiveModel as EntryActiveModel, Entity as TimeEntry};
use crate::models::{Timesheet, timesheet};

/// A stored entry with its breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEntry {
    pub entry: time_entry::Model,
    pub breaks: Vec<break_period::Model>,
}

impl RecordedEntry {
    pub fn interval(&self) -> WorkInterval {
        WorkInterval {
            in_time: self.entry.in_time,
            out_time: self.entry.out_time,
            breaks: self
                .breaks
                .iter()
                .map(|b| BreakSpan::new(b.start_time, b.end_time))
                .collect(),
        }
    }
}

pub struct TimeEntryRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TimeEntryRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    async fn with_breaks(&self, entries: Vec<time_entry::Model>) -> Result<Vec<RecordedEntry>, DbErr> {
        let breaks = entries.load_many(BreakPeriod, self.db).await?;
        Ok(entries
            .into_iter()
            .zip(breaks)
            .map(|(entry, mut breaks)| {
                breaks.sort_by_key(|b| b.start_time);
                RecordedEntry { entry, breaks }
            })
            .collect())
    }

    /// Every entry the employee recorded on `date`, across all of their
    /// timesheets.
    pub async fn for_employee_day(
        &self,
        employee_id: i32,
        date: NaiveDate,
    ) -> Result<Vec<RecordedEntry>, DbErr> {
        let entries = TimeEntry::find()
            .inner_join(Timesheet)
            .filter(timesheet::Column::EmployeeId.eq(employee_id))
            .filter(time_entry::Column::Date.eq(date))
            .order_by_asc(time_entry::Column::InTime)
            .all(self.db)
            .await?;
        self.with_breaks(entries).await
    }

    /// Entries of one timesheet ordered by date then start time.
    pub async fn for_timesheet(&self, timesheet_id: i32) -> Result<Vec<RecordedEntry>, DbErr> {
        let entries = TimeEntry::find()
            .filter(time_entry::Column::TimesheetId.eq(timesheet_id))
            .order_by_asc(time_entry::Column::Date)
            .order_by_asc(time_entry::Column::InTime)
            .all(self.db)
            .await?;
        self.with_breaks(entries).await
    }

    /// Entries across every timesheet of one employee, or of everyone.
    pub async fn for_employee(&self, employee_id: Option<i32>) -> Result<Vec<RecordedEntry>, DbErr> {
        let mut query = TimeEntry::find();
        if let Some(employee_id) = employee_id {
            query = query
                .inner_join(Timesheet)
                .filter(timesheet::Column::EmployeeId.eq(employee_id));
        }
        let entries = query.order_by_asc(time_entry::Column::Id).all(self.db).await?;
        self.with_breaks(entries).await
    }

    pub async fn find_in_timesheet(
        &self,
        timesheet_id: i32,
        entry_id: i32,
    ) -> Result<Option<time_entry::Model>, DbErr> {
        TimeEntry::find_by_id(entry_id)
            .filter(time_entry::Column::TimesheetId.eq(timesheet_id))
            .one(self.db)
            .await
    }

    /// Inserts an entry and its breaks. Validation is the caller's job.
    pub async fn insert(
        &self,
        timesheet_id: i32,
        date: NaiveDate,
        payload: &EntryPayload,
    ) -> Result<RecordedEntry, DbErr> {
        let entry = EntryActiveModel {
            timesheet_id: Set(timesheet_id),
            date: Set(date),
            in_time: Set(payload.in_time),
            out_time: Set(payload.out_time),
            project: Set(payload.project.clone()),
            note: Set(payload.note.clone()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let mut breaks = Vec::with_capacity(payload.breaks.len());
        for span in &payload.breaks {
            let stored = BreakActiveModel {
                time_entry_id: Set(entry.id),
                start_time: Set(span.start),
                end_time: Set(span.end),
                ..Default::default()
            }
            .insert(self.db)
            .await?;
            breaks.push(stored);
        }
        breaks.sort_by_key(|b| b.start_time);

        Ok(RecordedEntry { entry, breaks })
    }

    pub async fn delete(&self, entry_id: i32) -> Result<u64, DbErr> {
        BreakPeriod::delete_many()
            .filter(break_period::Column::TimeEntryId.eq(entry_id))
            .exec(self.db)
            .await?;
        Ok(TimeEntry::delete_by_id(entry_id).exec(self.db).await?.rows_affected)
    }

    pub async fn delete_for_timesheet(&self, timesheet_id: i32) -> Result<u64, DbErr> {
        let entry_ids: Vec<i32> = TimeEntry::find()
            .select_only()
            .column(time_entry::Column::Id)
            .filter(time_entry::Column::TimesheetId.eq(timesheet_id))
            .into_tuple()
            .all(self.db)
            .await?;
        if entry_ids.is_empty() {
            return Ok(0);
        }

        BreakPeriod::delete_many()
            .filter(break_period::Column::TimeEntryId.is_in(entry_ids))
            .exec(self.db)
            .await?;
        Ok(TimeEntry::delete_many()
            .filter(time_entry::Column::TimesheetId.eq(timesheet_id))
            .exec(self.db)
            .await?
            .rows_affected)
    }
}
