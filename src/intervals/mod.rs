//! # Worked Intervals
//!
//! Wall-clock interval arithmetic shared by the timesheet workflow: the
//! per-day validator, the hours calculator and the per-day wire mapping.
//! Everything here is pure and works on naive times within one calendar day.

pub mod hours;
pub mod validator;
pub mod wire;

use chrono::NaiveTime;
use serde::Serialize;

pub use hours::{HoursSummary, aggregate, daily_summaries, hours_worked};
pub use validator::{Accepted, DAILY_LIMIT_MINUTES, IntervalRejection, validate};
pub use wire::{BreakPayload, DatedEntryPayload, DayEntries, EntryPayload};

/// A pause inside a worked interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakSpan {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BreakSpan {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    fn seconds(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_seconds()
    }
}

/// A worked interval with its breaks, as recorded for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkInterval {
    pub in_time: NaiveTime,
    pub out_time: NaiveTime,
    pub breaks: Vec<BreakSpan>,
}

impl WorkInterval {
    pub fn new(in_time: NaiveTime, out_time: NaiveTime) -> Self {
        Self {
            in_time,
            out_time,
            breaks: Vec::new(),
        }
    }

    pub fn with_break(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.breaks.push(BreakSpan::new(start, end));
        self
    }

    fn gross_seconds(&self) -> i64 {
        self.out_time
            .signed_duration_since(self.in_time)
            .num_seconds()
    }

    fn break_seconds(&self) -> i64 {
        self.breaks.iter().map(BreakSpan::seconds).sum()
    }

    /// Worked seconds with breaks subtracted, never negative.
    pub fn net_seconds(&self) -> i64 {
        (self.gross_seconds() - self.break_seconds()).max(0)
    }
}

/// Half-open overlap: touching endpoints do not count.
pub(crate) fn strictly_overlaps(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
pub(crate) fn hm(value: &str) -> NaiveTime {
    wire::wall_clock::parse(value).unwrap()
}
