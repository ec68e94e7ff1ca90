//! Worked hours and the regular/overtime split.
//!
//! The 8 hour threshold is applied to each entry on its own, not to the sum
//! of a calendar day. Two 5 hour entries on the same day therefore produce no
//! overtime.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use super::WorkInterval;

pub const REGULAR_HOURS_PER_ENTRY: f64 = 8.0;

/// Regular, overtime and total hours over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct HoursSummary {
    #[schema(example = 8.0)]
    pub regular: f64,
    #[schema(example = 0.5)]
    pub overtime: f64,
    #[schema(example = 8.5)]
    pub total: f64,
}

impl HoursSummary {
    fn add_entry(&mut self, hours: f64) {
        let regular = hours.min(REGULAR_HOURS_PER_ENTRY);
        self.regular += regular;
        self.overtime += hours - regular;
        self.total += hours;
    }
}

/// Hours worked in one entry, breaks excluded.
pub fn hours_worked(entry: &WorkInterval) -> f64 {
    entry.net_seconds() as f64 / 3600.0
}

pub fn aggregate<'a, I>(entries: I) -> HoursSummary
where
    I: IntoIterator<Item = &'a WorkInterval>,
{
    let mut summary = HoursSummary::default();
    for entry in entries {
        summary.add_entry(hours_worked(entry));
    }
    summary
}

/// Per-date summaries, each computed with the per-entry threshold.
pub fn daily_summaries<'a, I>(entries: I) -> BTreeMap<NaiveDate, HoursSummary>
where
    I: IntoIterator<Item = (NaiveDate, &'a WorkInterval)>,
{
    let mut days: BTreeMap<NaiveDate, HoursSummary> = BTreeMap::new();
    for (date, entry) in entries {
        days.entry(date).or_default().add_entry(hours_worked(entry));
    }
    days
}
