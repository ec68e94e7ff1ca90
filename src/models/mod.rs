//! # Data Models
//!
//! SeaORM entities for the time-tracking store plus the string-backed enums
//! persisted in their status and role columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod audit_log;
pub mod break_period;
pub mod client;
pub mod employee;
pub mod time_entry;
pub mod time_off;
pub mod timesheet;

pub use audit_log::Entity as AuditLog;
pub use break_period::Entity as BreakPeriod;
pub use client::Entity as Client;
pub use employee::Entity as Employee;
pub use time_entry::Entity as TimeEntry;
pub use time_off::Entity as TimeOff;
pub use timesheet::Entity as Timesheet;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "timetracker".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error returned when a persisted or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Stable lowercase representation stored in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Role column of the employees table.
    RoleKind, "role", {
        Consultant => "consultant",
        ClientManager => "client_manager",
        DewAdmin => "dew_admin",
    }
);

string_enum!(
    /// Lifecycle state of a timesheet. `Pending` only exists on rows written
    /// before the draft/submitted split and is treated like `Submitted`.
    TimesheetStatus, "timesheet status", {
        Draft => "draft",
        Submitted => "submitted",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

string_enum!(
    /// Lifecycle state of a leave request.
    TimeOffStatus, "time-off status", {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

string_enum!(
    /// Kind of leave being requested.
    TimeOffKind, "time-off type", {
        Vacation => "vacation",
        Sick => "sick",
        Other => "other",
    }
);

string_enum!(
    /// Events recorded in the audit log.
    AuditEvent, "audit event", {
        TimesheetCreated => "timesheet_created",
        TimesheetUpdated => "timesheet_updated",
        TimesheetSubmitted => "timesheet_submitted",
        TimesheetApproved => "timesheet_approved",
        TimesheetRejected => "timesheet_rejected",
    }
);
