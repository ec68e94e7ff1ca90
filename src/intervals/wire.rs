//! Per-day entry mapping exchanged with clients.
//!
//! ```json
//! { "2025-01-06": [ { "in_time": "09:00", "out_time": "17:30",
//!                     "breaks": [ { "start": "12:00", "end": "12:30" } ],
//!                     "project": "billing", "note": null } ] }
//! ```
//!
//! Times are 24 hour wall-clock `HH:MM` or `HH:MM:SS` without an offset.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{BreakSpan, WorkInterval};

pub type DayEntries = BTreeMap<NaiveDate, Vec<EntryPayload>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BreakPayload {
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "12:00")]
    pub start: NaiveTime,
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "12:30")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EntryPayload {
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "09:00")]
    pub in_time: NaiveTime,
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "17:30")]
    pub out_time: NaiveTime,
    #[serde(default)]
    pub breaks: Vec<BreakPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EntryPayload {
    pub fn interval(&self) -> WorkInterval {
        WorkInterval {
            in_time: self.in_time,
            out_time: self.out_time,
            breaks: self
                .breaks
                .iter()
                .map(|b| BreakSpan::new(b.start, b.end))
                .collect(),
        }
    }
}

/// A single entry together with the day it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct DatedEntryPayload {
    #[schema(value_type = String, format = Date, example = "2025-01-06")]
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "09:00")]
    pub in_time: NaiveTime,
    #[serde(with = "wall_clock")]
    #[schema(value_type = String, example = "17:30")]
    pub out_time: NaiveTime,
    #[serde(default)]
    pub breaks: Vec<BreakPayload>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl DatedEntryPayload {
    pub fn into_parts(self) -> (NaiveDate, EntryPayload) {
        (
            self.date,
            EntryPayload {
                in_time: self.in_time,
                out_time: self.out_time,
                breaks: self.breaks,
                project: self.project,
                note: self.note,
            },
        )
    }
}

/// Serde adapter for `HH:MM[:SS]` wall-clock times.
pub mod wall_clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    }

    /// Whole minutes render as `HH:MM`, anything finer as `HH:MM:SS`.
    pub fn format(time: NaiveTime) -> String {
        if time.second() == 0 && time.nanosecond() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        }
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|_| {
            de::Error::custom(format!("invalid time '{raw}', expected HH:MM or HH:MM:SS"))
        })
    }
}
