//! Acceptance rules for a proposed time entry against the entries already
//! recorded for the same employee and day.
//!
//! Checks run in a fixed order and stop at the first failure: duration,
//! overlap with existing entries, break placement, break overlap, then the
//! 24 hour daily cap on net time.

use chrono::NaiveTime;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::{WorkInterval, strictly_overlaps};
use crate::intervals::wire::wall_clock;

pub const DAILY_LIMIT_MINUTES: i64 = 24 * 60;

const DAILY_LIMIT_SECONDS: i64 = DAILY_LIMIT_MINUTES * 60;

fn hhmm(time: &NaiveTime) -> String {
    wall_clock::format(*time)
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accepted {
    /// Net seconds of the proposed entry
    pub net_seconds: i64,
    /// Net seconds of the day including the proposed entry
    pub day_total_seconds: i64,
}

/// Why a proposed entry was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalRejection {
    #[error("out_time must be later than in_time")]
    NonPositiveDuration {
        in_time: NaiveTime,
        out_time: NaiveTime,
    },
    #[error(
        "entry overlaps an existing entry from {} to {}",
        hhmm(.existing_start),
        hhmm(.existing_end)
    )]
    OverlapsExisting {
        existing_start: NaiveTime,
        existing_end: NaiveTime,
    },
    #[error("break {index} must lie within the entry's in_time and out_time")]
    BreakOutsideEntry {
        index: usize,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("break {index} must end after it starts")]
    NonPositiveBreak {
        index: usize,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("break {first} overlaps break {second}")]
    OverlappingBreaks {
        first: usize,
        first_bounds: (NaiveTime, NaiveTime),
        second: usize,
        second_bounds: (NaiveTime, NaiveTime),
    },
    #[error(
        "total worked time for the day would be {total_minutes} minutes, above the {limit_minutes} minute limit"
    )]
    DailyLimitExceeded {
        total_minutes: i64,
        limit_minutes: i64,
    },
}

impl IntervalRejection {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            IntervalRejection::NonPositiveDuration { .. } => "non_positive_duration",
            IntervalRejection::OverlapsExisting { .. } => "overlaps_existing_entry",
            IntervalRejection::BreakOutsideEntry { .. } => "break_outside_entry",
            IntervalRejection::NonPositiveBreak { .. } => "non_positive_break",
            IntervalRejection::OverlappingBreaks { .. } => "overlapping_breaks",
            IntervalRejection::DailyLimitExceeded { .. } => "daily_limit_exceeded",
        }
    }

    /// Structured details for the error body.
    pub fn details(&self) -> Value {
        let f = hhmm;
        let extra = match self {
            IntervalRejection::NonPositiveDuration { in_time, out_time } => {
                json!({ "in_time": f(in_time), "out_time": f(out_time) })
            }
            IntervalRejection::OverlapsExisting {
                existing_start,
                existing_end,
            } => json!({ "conflict": { "in_time": f(existing_start), "out_time": f(existing_end) } }),
            IntervalRejection::BreakOutsideEntry { index, start, end }
            | IntervalRejection::NonPositiveBreak { index, start, end } => {
                json!({ "break_index": index, "start": f(start), "end": f(end) })
            }
            IntervalRejection::OverlappingBreaks {
                first,
                first_bounds,
                second,
                second_bounds,
            } => json!({
                "breaks": [
                    { "index": first, "start": f(&first_bounds.0), "end": f(&first_bounds.1) },
                    { "index": second, "start": f(&second_bounds.0), "end": f(&second_bounds.1) },
                ]
            }),
            IntervalRejection::DailyLimitExceeded {
                total_minutes,
                limit_minutes,
            } => json!({ "total_minutes": total_minutes, "limit_minutes": limit_minutes }),
        };

        let mut body = json!({ "reason": self.reason() });
        if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
            body.extend(extra);
        }
        body
    }
}

/// Validates `proposed` against the entries already recorded for its day.
pub fn validate(
    existing: &[WorkInterval],
    proposed: &WorkInterval,
) -> Result<Accepted, IntervalRejection> {
    if proposed.out_time <= proposed.in_time {
        return Err(IntervalRejection::NonPositiveDuration {
            in_time: proposed.in_time,
            out_time: proposed.out_time,
        });
    }

    if let Some(conflict) = existing.iter().find(|entry| {
        strictly_overlaps(
            proposed.in_time,
            proposed.out_time,
            entry.in_time,
            entry.out_time,
        )
    }) {
        return Err(IntervalRejection::OverlapsExisting {
            existing_start: conflict.in_time,
            existing_end: conflict.out_time,
        });
    }

    for (index, span) in proposed.breaks.iter().enumerate() {
        if span.start < proposed.in_time || span.end > proposed.out_time {
            return Err(IntervalRejection::BreakOutsideEntry {
                index,
                start: span.start,
                end: span.end,
            });
        }
        if span.end <= span.start {
            return Err(IntervalRejection::NonPositiveBreak {
                index,
                start: span.start,
                end: span.end,
            });
        }
    }

    for (first, a) in proposed.breaks.iter().enumerate() {
        for (offset, b) in proposed.breaks[first + 1..].iter().enumerate() {
            if strictly_overlaps(a.start, a.end, b.start, b.end) {
                return Err(IntervalRejection::OverlappingBreaks {
                    first,
                    first_bounds: (a.start, a.end),
                    second: first + 1 + offset,
                    second_bounds: (b.start, b.end),
                });
            }
        }
    }

    let net_seconds = proposed.net_seconds();
    let day_total_seconds = existing
        .iter()
        .map(WorkInterval::net_seconds)
        .sum::<i64>()
        + net_seconds;

    if day_total_seconds > DAILY_LIMIT_SECONDS {
        return Err(IntervalRejection::DailyLimitExceeded {
            total_minutes: day_total_seconds / 60,
            limit_minutes: DAILY_LIMIT_MINUTES,
        });
    }

    Ok(Accepted {
        net_seconds,
        day_total_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::hm;

    fn entry(start: &str, end: &str) -> WorkInterval {
        WorkInterval::new(hm(start), hm(end))
    }

    #[test]
    fn rejects_zero_and_negative_duration() {
        assert!(matches!(
            validate(&[], &entry("09:00", "09:00")),
            Err(IntervalRejection::NonPositiveDuration { .. })
        ));
        assert!(matches!(
            validate(&[], &entry("17:00", "09:00")),
            Err(IntervalRejection::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn touching_entries_are_accepted() {
        let morning = entry("08:00", "12:00");
        assert!(validate(std::slice::from_ref(&morning), &entry("12:00", "16:00")).is_ok());
        assert!(validate(&[morning], &entry("06:00", "08:00")).is_ok());
    }

    #[test]
    fn overlap_reports_conflicting_bounds() {
        let existing = [entry("08:00", "10:00"), entry("13:00", "17:00")];
        let err = validate(&existing, &entry("16:30", "18:00")).unwrap_err();
        assert_eq!(
            err,
            IntervalRejection::OverlapsExisting {
                existing_start: hm("13:00"),
                existing_end: hm("17:00"),
            }
        );
        assert_eq!(err.details()["conflict"]["in_time"], "13:00");
    }

    #[test]
    fn contained_entry_overlaps() {
        let existing = [entry("08:00", "18:00")];
        assert!(matches!(
            validate(&existing, &entry("10:00", "11:00")),
            Err(IntervalRejection::OverlapsExisting { .. })
        ));
    }

    #[test]
    fn break_must_sit_inside_entry() {
        let proposed = entry("09:00", "17:00").with_break(hm("08:30"), hm("09:30"));
        assert!(matches!(
            validate(&[], &proposed),
            Err(IntervalRejection::BreakOutsideEntry { index: 0, .. })
        ));

        let proposed = entry("09:00", "17:00").with_break(hm("16:30"), hm("17:15"));
        assert!(matches!(
            validate(&[], &proposed),
            Err(IntervalRejection::BreakOutsideEntry { index: 0, .. })
        ));
    }

    #[test]
    fn break_touching_entry_bounds_is_fine() {
        let proposed = entry("09:00", "17:00")
            .with_break(hm("09:00"), hm("09:15"))
            .with_break(hm("16:45"), hm("17:00"));
        assert!(validate(&[], &proposed).is_ok());
    }

    #[test]
    fn empty_break_is_rejected() {
        let proposed = entry("09:00", "17:00").with_break(hm("12:00"), hm("12:00"));
        assert!(matches!(
            validate(&[], &proposed),
            Err(IntervalRejection::NonPositiveBreak { index: 0, .. })
        ));
    }

    #[test]
    fn overlapping_breaks_report_both_indices() {
        let proposed = entry("09:00", "17:00")
            .with_break(hm("10:00"), hm("10:15"))
            .with_break(hm("12:00"), hm("12:45"))
            .with_break(hm("12:30"), hm("13:00"));
        let err = validate(&[], &proposed).unwrap_err();
        assert_eq!(
            err,
            IntervalRejection::OverlappingBreaks {
                first: 1,
                first_bounds: (hm("12:00"), hm("12:45")),
                second: 2,
                second_bounds: (hm("12:30"), hm("13:00")),
            }
        );
        assert_eq!(err.details()["breaks"][1]["index"], 2);
    }

    #[test]
    fn back_to_back_breaks_are_fine() {
        let proposed = entry("09:00", "17:00")
            .with_break(hm("12:00"), hm("12:30"))
            .with_break(hm("12:30"), hm("13:00"));
        assert!(validate(&[], &proposed).is_ok());
    }

    // Existing rows are not re-validated against each other, so a day that
    // already holds overlapping history can approach the cap.
    fn day_with_net_minutes_1430() -> Vec<WorkInterval> {
        vec![
            entry("00:00", "12:00"),
            entry("01:00", "12:00"),
            entry("11:10", "12:00"),
        ]
    }

    #[test]
    fn daily_cap_is_inclusive() {
        let existing = day_with_net_minutes_1430();
        let accepted = validate(&existing, &entry("12:00", "12:10")).unwrap();
        assert_eq!(accepted.day_total_seconds, DAILY_LIMIT_MINUTES * 60);
    }

    #[test]
    fn exceeding_daily_cap_is_rejected() {
        let existing = day_with_net_minutes_1430();
        let err = validate(&existing, &entry("12:00", "12:20")).unwrap_err();
        assert_eq!(
            err,
            IntervalRejection::DailyLimitExceeded {
                total_minutes: 1450,
                limit_minutes: 1440,
            }
        );
    }

    #[test]
    fn breaks_count_against_net_total() {
        let existing = day_with_net_minutes_1430();
        let proposed = entry("12:00", "12:20").with_break(hm("12:05"), hm("12:15"));
        assert_eq!(validate(&existing, &proposed).unwrap().net_seconds, 600);
    }

    #[test]
    fn validation_is_idempotent() {
        let existing = [entry("08:00", "12:00")];
        let proposed = entry("13:00", "17:00").with_break(hm("15:00"), hm("15:10"));
        assert_eq!(
            validate(&existing, &proposed),
            validate(&existing, &proposed)
        );
    }
}
