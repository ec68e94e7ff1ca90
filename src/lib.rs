//! # Timetracker Library
//!
//! Weekly timesheets, leave requests and the approval workflows around them,
//! served over an axum API backed by SeaORM.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod handlers;
pub mod intervals;
pub mod models;
pub mod notify;
pub mod policy;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub mod workflow;
pub use migration;
