//! # Repository Layer
//!
//! Thin SeaORM wrappers, one per table group. Every repository is generic over
//! [`sea_orm::ConnectionTrait`] so the same code runs on the pool or inside a
//! workflow transaction.

pub mod audit_log;
pub mod client;
pub mod employee;
pub mod time_entry;
pub mod time_off;
pub mod timesheet;

pub use audit_log::AuditLogRepository;
pub use client::{ClientChanges, ClientRepository, NewClient};
pub use employee::{EmployeeChanges, EmployeeRepository, NewEmployee, normalize_email};
pub use time_entry::{RecordedEntry, TimeEntryRepository};
pub use time_off::{NewTimeOff, TimeOffRepository};
pub use timesheet::{NewTimesheet, TimesheetRepository};
