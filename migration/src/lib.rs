//! Database migrations for the time-tracking service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_000001_create_clients;
mod m2025_01_06_000002_create_employees;
mod m2025_01_06_000003_create_timesheets;
mod m2025_01_06_000004_create_time_entries;
mod m2025_01_06_000005_create_break_periods;
mod m2025_01_06_000006_create_time_off;
mod m2025_01_06_000007_create_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_000001_create_clients::Migration),
            Box::new(m2025_01_06_000002_create_employees::Migration),
            Box::new(m2025_01_06_000003_create_timesheets::Migration),
            Box::new(m2025_01_06_000004_create_time_entries::Migration),
            Box::new(m2025_01_06_000005_create_break_periods::Migration),
            Box::new(m2025_01_06_000006_create_time_off::Migration),
            Box::new(m2025_01_06_000007_create_audit_logs::Migration),
        ]
    }
}
