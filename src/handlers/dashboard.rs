//! # Dashboard API Handler
//!
//! Per-role summary computed from stored data.

use std::collections::BTreeMap;

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::CurrentActor;
use crate::error::{ApiError, DomainError};
use crate::intervals::{HoursSummary, aggregate};
use crate::policy::Role;
use crate::repositories::{
    ClientRepository, EmployeeRepository, RecordedEntry, TimeEntryRepository, TimeOffRepository,
    TimesheetRepository,
};
use crate::server::AppState;

/// Summary shown on the landing page, shaped by the caller's role
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DashboardSummary {
    Consultant {
        full_name: String,
        /// Hours over every entry the consultant recorded
        hours: HoursSummary,
        /// Timesheet count per status
        #[schema(value_type = Object)]
        timesheets: BTreeMap<String, i64>,
        /// Time-off request count per status
        #[schema(value_type = Object)]
        time_off: BTreeMap<String, i64>,
    },
    ClientManager {
        full_name: String,
        /// Timesheets of the manager's client waiting for their decision
        timesheets_awaiting_approval: u64,
        /// Pending leave requests addressed to the manager
        time_off_awaiting_approval: u64,
        team_size: u64,
    },
    DewAdmin {
        full_name: String,
        total_employees: u64,
        total_clients: u64,
        total_timesheets: u64,
        total_hours: f64,
    },
}

fn hours_of(entries: &[RecordedEntry]) -> HoursSummary {
    let intervals: Vec<_> = entries.iter().map(RecordedEntry::interval).collect();
    aggregate(&intervals)
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Role-specific summary", body = DashboardSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<DashboardSummary>, ApiError> {
    let db = &state.db;
    let me = EmployeeRepository::new(db)
        .find_by_id(actor.id)
        .await?
        .ok_or_else(|| DomainError::not_found("Employee", actor.id))?;

    let summary = match actor.role {
        Role::Consultant { .. } => {
            let entries = TimeEntryRepository::new(db)
                .for_employee(Some(actor.id))
                .await?;
            DashboardSummary::Consultant {
                full_name: me.full_name,
                hours: hours_of(&entries),
                timesheets: TimesheetRepository::new(db)
                    .status_counts(actor.id)
                    .await?
                    .into_iter()
                    .collect(),
                time_off: TimeOffRepository::new(db)
                    .status_counts(actor.id)
                    .await?
                    .into_iter()
                    .collect(),
            }
        }
        Role::ClientManager { client_id } => DashboardSummary::ClientManager {
            full_name: me.full_name,
            timesheets_awaiting_approval: TimesheetRepository::new(db)
                .count_awaiting(&actor.email, client_id)
                .await?,
            time_off_awaiting_approval: TimeOffRepository::new(db)
                .count_awaiting(&actor.email, client_id)
                .await?,
            team_size: EmployeeRepository::new(db).count_in_client(client_id).await?,
        },
        Role::DewAdmin => {
            let entries = TimeEntryRepository::new(db).for_employee(None).await?;
            DashboardSummary::DewAdmin {
                full_name: me.full_name,
                total_employees: EmployeeRepository::new(db).count().await?,
                total_clients: ClientRepository::new(db).count().await?,
                total_timesheets: TimesheetRepository::new(db).count().await?,
                total_hours: hours_of(&entries).total,
            }
        }
    };
    Ok(Json(summary))
}
