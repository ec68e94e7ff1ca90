//! # Workflows
//!
//! Approval state machines for timesheets and leave requests. Each mutating
//! operation runs in the same order: load, access policy, state and interval
//! checks, persistence in one transaction, then a notification request.

pub mod day_lock;
pub mod time_off;
pub mod timesheet;

pub use day_lock::{DayGuard, DayLocks};
pub use time_off::{NewTimeOffRequest, TimeOffPatch, TimeOffService, TimeOffView};
pub use timesheet::{
    AuditEntryView, CreatedEntry, NewTimesheetRequest, StoredEntry, TimesheetHours, TimesheetPatch,
    TimesheetService, TimesheetView, Transition,
};

use serde_json::json;

use crate::error::DomainError;
use crate::models::employee;
use crate::policy::Ownership;
use crate::repositories::normalize_email;

/// Ownership of a record addressed to `manager_email` and owned by `owner`.
pub(crate) fn ownership<'a>(owner: &employee::Model, manager_email: &'a str) -> Ownership<'a> {
    Ownership {
        owner_id: owner.id,
        owner_client_id: owner.client_id,
        manager_email,
    }
}

pub(crate) fn authorize(allowed: bool, message: &str) -> Result<(), DomainError> {
    if allowed {
        Ok(())
    } else {
        Err(DomainError::forbidden(message))
    }
}

/// Normalises an address and rejects obviously malformed ones.
pub(crate) fn email_address(raw: &str, field: &str) -> Result<String, DomainError> {
    let email = normalize_email(raw);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation_with(
            format!("{field} must be a valid email address"),
            json!({ "field": field }),
        ))
    }
}

pub(crate) fn manager_address(raw: &str) -> Result<String, DomainError> {
    email_address(raw, "manager_email")
}
