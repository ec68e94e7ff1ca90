//! # Timesheet Workflow
//!
//! `draft -> submitted -> {approved, rejected}`. Legacy rows in `pending` are
//! handled like `submitted`.
//!
//! Owners and administrators may change entries and free-text fields while a
//! timesheet is `draft` or `submitted`; `approved` and `rejected` are final.
//! Entry inserts hold the `(employee, date)` day lock across
//! "read day, validate, insert" and run in one transaction.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use metrics::counter;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{DayLocks, authorize, manager_address, ownership};
use crate::error::DomainError;
use crate::intervals::{
    BreakPayload, DayEntries, EntryPayload, HoursSummary, IntervalRejection, WorkInterval, aggregate,
    daily_summaries, validate,
};
use crate::models::{AuditEvent, RoleKind, TimesheetStatus, audit_log, employee, timesheet};
use crate::notify::{Notification, NotificationQueue};
use crate::policy::{Actor, Operation, Resource, ResourceType, can_mutate, can_view, scope_for};
use crate::repositories::{
    AuditLogRepository, EmployeeRepository, NewTimesheet, RecordedEntry, TimeEntryRepository,
    TimesheetRepository,
};

/// Status changes a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve,
    Reject,
}

impl Transition {
    fn operation(self) -> Operation {
        match self {
            Transition::Submit => Operation::Submit,
            Transition::Approve => Operation::Approve,
            Transition::Reject => Operation::Reject,
        }
    }

    fn target(self) -> TimesheetStatus {
        match self {
            Transition::Submit => TimesheetStatus::Submitted,
            Transition::Approve => TimesheetStatus::Approved,
            Transition::Reject => TimesheetStatus::Rejected,
        }
    }

    fn event(self) -> AuditEvent {
        match self {
            Transition::Submit => AuditEvent::TimesheetSubmitted,
            Transition::Approve => AuditEvent::TimesheetApproved,
            Transition::Reject => AuditEvent::TimesheetRejected,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Transition::Submit => "Only the owner can submit a timesheet",
            Transition::Approve => "Only the manager this timesheet is addressed to can approve it",
            Transition::Reject => "Only the manager this timesheet is addressed to can reject it",
        }
    }

    /// Statuses the transition may start from.
    fn sources(self) -> &'static [TimesheetStatus] {
        match self {
            Transition::Submit => &[TimesheetStatus::Draft],
            Transition::Approve | Transition::Reject => {
                &[TimesheetStatus::Submitted, TimesheetStatus::Pending]
            }
        }
    }

    /// State precondition of the transition.
    pub fn check_state(self, status: TimesheetStatus) -> Result<(), DomainError> {
        match self {
            Transition::Submit => ensure_submittable(status),
            Transition::Approve | Transition::Reject => ensure_decidable(status, self),
        }
    }
}

impl TryFrom<TimesheetStatus> for Transition {
    type Error = DomainError;

    fn try_from(status: TimesheetStatus) -> Result<Self, Self::Error> {
        match status {
            TimesheetStatus::Submitted => Ok(Transition::Submit),
            TimesheetStatus::Approved => Ok(Transition::Approve),
            TimesheetStatus::Rejected => Ok(Transition::Reject),
            TimesheetStatus::Draft | TimesheetStatus::Pending => Err(DomainError::validation_with(
                format!("status cannot be set to {status}"),
                json!({ "field": "status", "allowed": ["submitted", "approved", "rejected"] }),
            )),
        }
    }
}

pub fn ensure_submittable(status: TimesheetStatus) -> Result<(), DomainError> {
    match status {
        TimesheetStatus::Draft => Ok(()),
        TimesheetStatus::Submitted
        | TimesheetStatus::Pending
        | TimesheetStatus::Approved
        | TimesheetStatus::Rejected => Err(DomainError::validation_with(
            "Only draft timesheets can be submitted",
            json!({ "status": status }),
        )),
    }
}

fn ensure_decidable(status: TimesheetStatus, transition: Transition) -> Result<(), DomainError> {
    match status {
        TimesheetStatus::Submitted | TimesheetStatus::Pending => Ok(()),
        TimesheetStatus::Draft | TimesheetStatus::Approved | TimesheetStatus::Rejected => {
            let verb = match transition {
                Transition::Reject => "rejected",
                Transition::Submit | Transition::Approve => "approved",
            };
            Err(DomainError::validation_with(
                format!("Only submitted timesheets can be {verb}"),
                json!({ "status": status }),
            ))
        }
    }
}

const EDITABLE: &[TimesheetStatus] = &[
    TimesheetStatus::Draft,
    TimesheetStatus::Submitted,
    TimesheetStatus::Pending,
];

/// Entries, fields and the timesheet itself can change until a decision.
pub fn ensure_editable(status: TimesheetStatus) -> Result<(), DomainError> {
    match status {
        TimesheetStatus::Draft | TimesheetStatus::Submitted | TimesheetStatus::Pending => Ok(()),
        TimesheetStatus::Approved | TimesheetStatus::Rejected => Err(DomainError::validation_with(
            format!("Timesheet is {status} and can no longer be changed"),
            json!({ "status": status }),
        )),
    }
}

fn ensure_in_week(week_start: NaiveDate, date: NaiveDate) -> Result<(), DomainError> {
    let week_end = week_start + Duration::days(6);
    if (week_start..=week_end).contains(&date) {
        Ok(())
    } else {
        Err(DomainError::validation_with(
            format!("Entry date {date} is outside the week starting {week_start}"),
            json!({ "field": "date", "week_start": week_start, "week_end": week_end }),
        ))
    }
}

/// Rejection for the `index`-th entry proposed on `date`.
fn entry_rejected(date: NaiveDate, index: usize, rejection: IntervalRejection) -> DomainError {
    let mut details = rejection.details();
    if let Some(map) = details.as_object_mut() {
        map.insert("date".to_string(), json!(date));
        map.insert("entry_index".to_string(), json!(index));
    }
    DomainError::validation_with(rejection.to_string(), details)
}

/// Payload of `POST /timesheets`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewTimesheetRequest {
    /// Owner of the timesheet; defaults to the caller. Administrators only.
    #[serde(default)]
    pub employee_id: Option<i32>,
    /// Monday of the covered week
    #[schema(value_type = String, format = Date, example = "2025-01-06")]
    pub week_start: NaiveDate,
    #[schema(example = "manager@acme.example")]
    pub manager_email: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Initial entries keyed by ISO date
    #[serde(default)]
    #[schema(value_type = Object)]
    pub entries: DayEntries,
}

/// Payload of `PUT /timesheets/{id}`. A `status` runs the transition of the
/// same name.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TimesheetPatch {
    pub comment: Option<String>,
    pub project: Option<String>,
    pub status: Option<TimesheetStatus>,
}

/// A stored entry as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredEntry {
    pub id: i32,
    #[serde(flatten)]
    pub entry: EntryPayload,
}

impl From<&RecordedEntry> for StoredEntry {
    fn from(recorded: &RecordedEntry) -> Self {
        StoredEntry {
            id: recorded.entry.id,
            entry: EntryPayload {
                in_time: recorded.entry.in_time,
                out_time: recorded.entry.out_time,
                breaks: recorded
                    .breaks
                    .iter()
                    .map(|b| BreakPayload {
                        start: b.start_time,
                        end: b.end_time,
                    })
                    .collect(),
                project: recorded.entry.project.clone(),
                note: recorded.entry.note.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimesheetView {
    pub id: i32,
    pub employee_id: i32,
    #[schema(value_type = String, format = Date)]
    pub week_start: NaiveDate,
    pub status: TimesheetStatus,
    pub manager_email: String,
    pub project: Option<String>,
    pub comment: Option<String>,
    pub manager_comment: Option<String>,
    pub approved_by: Option<i32>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub approved_at: Option<DateTimeWithTimeZone>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub submitted_at: Option<DateTimeWithTimeZone>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
    /// Entries keyed by ISO date
    #[schema(value_type = Object)]
    pub entries: BTreeMap<NaiveDate, Vec<StoredEntry>>,
    pub hours: HoursSummary,
    #[schema(value_type = Object)]
    pub daily_hours: BTreeMap<NaiveDate, HoursSummary>,
}

impl TimesheetView {
    fn build(sheet: timesheet::Model, recorded: &[RecordedEntry]) -> Result<Self, DomainError> {
        let status = sheet.status()?;
        let hours = HoursReport::from_entries(recorded);

        let mut entries: BTreeMap<NaiveDate, Vec<StoredEntry>> = BTreeMap::new();
        for item in recorded {
            entries
                .entry(item.entry.date)
                .or_default()
                .push(StoredEntry::from(item));
        }

        Ok(TimesheetView {
            id: sheet.id,
            employee_id: sheet.employee_id,
            week_start: sheet.week_start,
            status,
            manager_email: sheet.manager_email,
            project: sheet.project,
            comment: sheet.comment,
            manager_comment: sheet.manager_comment,
            approved_by: sheet.approved_by,
            approved_at: sheet.approved_at,
            submitted_at: sheet.submitted_at,
            created_at: sheet.created_at,
            updated_at: sheet.updated_at,
            entries,
            hours: hours.summary,
            daily_hours: hours.days,
        })
    }
}

struct HoursReport {
    summary: HoursSummary,
    days: BTreeMap<NaiveDate, HoursSummary>,
}

impl HoursReport {
    fn from_entries(recorded: &[RecordedEntry]) -> Self {
        let intervals: Vec<(NaiveDate, WorkInterval)> = recorded
            .iter()
            .map(|item| (item.entry.date, item.interval()))
            .collect();
        HoursReport {
            summary: aggregate(intervals.iter().map(|(_, interval)| interval)),
            days: daily_summaries(intervals.iter().map(|(date, interval)| (*date, interval))),
        }
    }
}

/// Response of `GET /timesheets/{id}/hours`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimesheetHours {
    pub timesheet_id: i32,
    pub summary: HoursSummary,
    #[schema(value_type = Object)]
    pub days: BTreeMap<NaiveDate, HoursSummary>,
}

/// Response of `POST /timesheets/{id}/entries`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedEntry {
    pub timesheet_id: i32,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub entry: StoredEntry,
    /// Net hours recorded for the day including this entry
    pub day_total_hours: f64,
}

/// One row of a timesheet's audit trail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntryView {
    pub id: i32,
    #[schema(example = "timesheet_submitted")]
    pub event: String,
    pub actor_id: Option<i32>,
    pub actor_email: String,
    pub actor_role: String,
    pub details: Option<serde_json::Value>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

impl From<audit_log::Model> for AuditEntryView {
    fn from(row: audit_log::Model) -> Self {
        AuditEntryView {
            id: row.id,
            event: row.event,
            actor_id: row.actor_id,
            actor_email: row.actor_email,
            actor_role: row.actor_role,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

/// Conditional write on the timesheet row inside `txn`. When the stored
/// status is no longer one of `from`, the current status is re-read and
/// reported through `check`.
async fn guard_status<C, F>(
    txn: &C,
    id: i32,
    from: &[TimesheetStatus],
    target: Option<TimesheetStatus>,
    check: F,
) -> Result<(), DomainError>
where
    C: ConnectionTrait,
    F: Fn(TimesheetStatus) -> Result<(), DomainError>,
{
    let repo = TimesheetRepository::new(txn);
    if repo.guard_status(id, from, target).await? {
        return Ok(());
    }

    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Timesheet", id))?;
    let status = current.status()?;
    check(status)?;
    Err(DomainError::validation_with(
        "Timesheet status changed while the request was processed",
        json!({ "status": status }),
    ))
}

pub struct TimesheetService<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a NotificationQueue,
    locks: &'a DayLocks,
}

impl<'a> TimesheetService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        notifier: &'a NotificationQueue,
        locks: &'a DayLocks,
    ) -> Self {
        Self {
            db,
            notifier,
            locks,
        }
    }

    async fn load(&self, id: i32) -> Result<(timesheet::Model, employee::Model), DomainError> {
        TimesheetRepository::new(self.db)
            .find_with_owner(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Timesheet", id))
    }

    async fn view(&self, sheet: timesheet::Model) -> Result<TimesheetView, DomainError> {
        let recorded = TimeEntryRepository::new(self.db)
            .for_timesheet(sheet.id)
            .await?;
        TimesheetView::build(sheet, &recorded)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<TimesheetView>, DomainError> {
        let scope = scope_for(actor, ResourceType::Timesheet);
        let sheets = TimesheetRepository::new(self.db).list(scope).await?;
        let mut views = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            views.push(self.view(sheet).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> Result<TimesheetView, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_view(actor, &resource),
            "Not authorized to view this timesheet",
        )?;
        self.view(sheet).await
    }

    pub async fn hours(&self, actor: &Actor, id: i32) -> Result<TimesheetHours, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_view(actor, &resource),
            "Not authorized to view this timesheet",
        )?;

        let recorded = TimeEntryRepository::new(self.db)
            .for_timesheet(sheet.id)
            .await?;
        let report = HoursReport::from_entries(&recorded);
        Ok(TimesheetHours {
            timesheet_id: sheet.id,
            summary: report.summary,
            days: report.days,
        })
    }

    /// Lifecycle events of one timesheet, oldest first.
    pub async fn audit_trail(
        &self,
        actor: &Actor,
        id: i32,
    ) -> Result<Vec<AuditEntryView>, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_view(actor, &resource),
            "Not authorized to view this timesheet",
        )?;

        let rows = AuditLogRepository::new(self.db)
            .for_timesheet(sheet.id)
            .await?;
        Ok(rows.into_iter().map(AuditEntryView::from).collect())
    }

    /// Creates a draft timesheet with its initial entries. Entries are
    /// validated day by day in date order against everything the owner
    /// already recorded on that day plus the entries accepted before them.
    #[instrument(skip_all, fields(actor_id = actor.id))]
    pub async fn create(
        &self,
        actor: &Actor,
        request: NewTimesheetRequest,
    ) -> Result<TimesheetView, DomainError> {
        let owner_id = request.employee_id.unwrap_or(actor.id);
        let owner = EmployeeRepository::new(self.db)
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Employee", owner_id))?;

        let manager_email = manager_address(&request.manager_email)?;
        let resource = Resource::Timesheet(ownership(&owner, &manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::Create),
            "Not allowed to create timesheets for this employee",
        )?;
        authorize(
            owner.role_kind()? == RoleKind::Consultant,
            "Only consultants can own timesheets",
        )?;

        if request.week_start.weekday() != Weekday::Mon {
            return Err(DomainError::validation_with(
                "week_start must be a Monday",
                json!({ "field": "week_start", "value": request.week_start }),
            ));
        }
        for date in request.entries.keys() {
            ensure_in_week(request.week_start, *date)?;
        }

        let _guards = self
            .locks
            .acquire_all(owner.id, request.entries.keys().copied())
            .await;

        let txn = self.db.begin().await?;
        let sheet = TimesheetRepository::new(&txn)
            .create(NewTimesheet {
                employee_id: owner.id,
                week_start: request.week_start,
                manager_email,
                project: request.project,
                comment: request.comment,
            })
            .await?;

        let entry_repo = TimeEntryRepository::new(&txn);
        let mut entry_count = 0usize;
        for (date, proposals) in &request.entries {
            let mut accepted: Vec<WorkInterval> = entry_repo
                .for_employee_day(owner.id, *date)
                .await?
                .iter()
                .map(RecordedEntry::interval)
                .collect();

            for (index, payload) in proposals.iter().enumerate() {
                let interval = payload.interval();
                validate(&accepted, &interval)
                    .map_err(|rejection| entry_rejected(*date, index, rejection))?;
                entry_repo.insert(sheet.id, *date, payload).await?;
                accepted.push(interval);
                entry_count += 1;
            }
        }

        AuditLogRepository::new(&txn)
            .record(
                sheet.id,
                AuditEvent::TimesheetCreated,
                actor,
                json!({ "week_start": sheet.week_start, "entries": entry_count }),
            )
            .await?;
        txn.commit().await?;

        counter!("timesheets_created_total").increment(1);
        info!(
            timesheet_id = sheet.id,
            employee_id = sheet.employee_id,
            entries = entry_count,
            "Timesheet created"
        );
        self.view(sheet).await
    }

    /// Applies a field patch and, when `status` is present, the matching
    /// transition. All checks run before anything is written.
    #[instrument(skip_all, fields(actor_id = actor.id, timesheet_id = id))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        patch: TimesheetPatch,
    ) -> Result<TimesheetView, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let status = sheet.status()?;
        let has_fields = patch.comment.is_some() || patch.project.is_some();
        let transition = patch.status.map(Transition::try_from).transpose()?;

        if !has_fields && transition.is_none() {
            return Err(DomainError::validation(
                "Nothing to update; send comment, project or status",
            ));
        }

        {
            let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
            if has_fields {
                authorize(
                    can_mutate(actor, &resource, Operation::Update),
                    "Not allowed to update this timesheet",
                )?;
                ensure_editable(status)?;
            }
            if let Some(transition) = transition {
                authorize(
                    can_mutate(actor, &resource, transition.operation()),
                    transition.denial(),
                )?;
                transition.check_state(status)?;
            }
        }

        let txn = self.db.begin().await?;
        let mut sheet = sheet;
        if has_fields {
            let from = transition.map_or(EDITABLE, Transition::sources);
            guard_status(&txn, sheet.id, from, None, |current| {
                ensure_editable(current)?;
                transition.map_or(Ok(()), |transition| transition.check_state(current))
            })
            .await?;

            let mut changed = Vec::new();
            let mut active = sheet.into_active_model();
            if let Some(comment) = patch.comment {
                active.comment = Set(Some(comment));
                changed.push("comment");
            }
            if let Some(project) = patch.project {
                active.project = Set(Some(project));
                changed.push("project");
            }
            sheet = TimesheetRepository::new(&txn).save(active).await?;
            AuditLogRepository::new(&txn)
                .record(
                    sheet.id,
                    AuditEvent::TimesheetUpdated,
                    actor,
                    json!({ "fields": changed }),
                )
                .await?;
        }

        if let Some(transition) = transition {
            sheet = apply_transition(&txn, actor, sheet, status, transition, None).await?;
        }
        txn.commit().await?;

        if let Some(transition) = transition {
            self.after_transition(&sheet, &owner, transition);
        }
        self.view(sheet).await
    }

    #[instrument(skip_all, fields(actor_id = actor.id, timesheet_id = id))]
    pub async fn delete(&self, actor: &Actor, id: i32) -> Result<(), DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::Delete),
            "Not allowed to delete this timesheet",
        )?;
        ensure_editable(sheet.status()?)?;

        let txn = self.db.begin().await?;
        guard_status(&txn, sheet.id, EDITABLE, None, ensure_editable).await?;
        TimesheetRepository::new(&txn).delete(sheet.id).await?;
        txn.commit().await?;

        info!(timesheet_id = sheet.id, employee_id = owner.id, "Timesheet deleted");
        Ok(())
    }

    /// Validates and stores one entry with its breaks.
    #[instrument(skip_all, fields(actor_id = actor.id, timesheet_id = id, date = %date))]
    pub async fn add_entry(
        &self,
        actor: &Actor,
        id: i32,
        date: NaiveDate,
        payload: EntryPayload,
    ) -> Result<CreatedEntry, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::AddEntry),
            "Not allowed to change entries of this timesheet",
        )?;
        ensure_editable(sheet.status()?)?;
        ensure_in_week(sheet.week_start, date)?;

        let _guard = self.locks.acquire(owner.id, date).await;
        let txn = self.db.begin().await?;
        guard_status(&txn, sheet.id, EDITABLE, None, ensure_editable).await?;
        let entry_repo = TimeEntryRepository::new(&txn);

        let existing: Vec<WorkInterval> = entry_repo
            .for_employee_day(owner.id, date)
            .await?
            .iter()
            .map(RecordedEntry::interval)
            .collect();
        let accepted = validate(&existing, &payload.interval())
            .map_err(|rejection| entry_rejected(date, existing.len(), rejection))?;

        let recorded = entry_repo.insert(sheet.id, date, &payload).await?;
        AuditLogRepository::new(&txn)
            .record(
                sheet.id,
                AuditEvent::TimesheetUpdated,
                actor,
                json!({ "action": "entry_added", "entry_id": recorded.entry.id, "date": date }),
            )
            .await?;
        txn.commit().await?;

        counter!("time_entries_created_total").increment(1);
        Ok(CreatedEntry {
            timesheet_id: id,
            date,
            entry: StoredEntry::from(&recorded),
            day_total_hours: accepted.day_total_seconds as f64 / 3600.0,
        })
    }

    #[instrument(skip_all, fields(actor_id = actor.id, timesheet_id = id, entry_id = entry_id))]
    pub async fn delete_entry(
        &self,
        actor: &Actor,
        id: i32,
        entry_id: i32,
    ) -> Result<(), DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::DeleteEntry),
            "Not allowed to change entries of this timesheet",
        )?;
        ensure_editable(sheet.status()?)?;

        let txn = self.db.begin().await?;
        guard_status(&txn, sheet.id, EDITABLE, None, ensure_editable).await?;
        let entry_repo = TimeEntryRepository::new(&txn);
        let entry = entry_repo
            .find_in_timesheet(sheet.id, entry_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Time entry", entry_id))?;
        entry_repo.delete(entry.id).await?;
        AuditLogRepository::new(&txn)
            .record(
                sheet.id,
                AuditEvent::TimesheetUpdated,
                actor,
                json!({ "action": "entry_deleted", "entry_id": entry.id, "date": entry.date }),
            )
            .await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn submit(&self, actor: &Actor, id: i32) -> Result<TimesheetView, DomainError> {
        self.transition(actor, id, Transition::Submit, None).await
    }

    pub async fn approve(
        &self,
        actor: &Actor,
        id: i32,
        comment: Option<String>,
    ) -> Result<TimesheetView, DomainError> {
        self.transition(actor, id, Transition::Approve, comment).await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: i32,
        comment: Option<String>,
    ) -> Result<TimesheetView, DomainError> {
        self.transition(actor, id, Transition::Reject, comment).await
    }

    #[instrument(skip_all, fields(actor_id = actor.id, timesheet_id = id, ?transition))]
    async fn transition(
        &self,
        actor: &Actor,
        id: i32,
        transition: Transition,
        comment: Option<String>,
    ) -> Result<TimesheetView, DomainError> {
        let (sheet, owner) = self.load(id).await?;
        let status = sheet.status()?;
        let resource = Resource::Timesheet(ownership(&owner, &sheet.manager_email));
        authorize(
            can_mutate(actor, &resource, transition.operation()),
            transition.denial(),
        )?;
        transition.check_state(status)?;

        let txn = self.db.begin().await?;
        let sheet = apply_transition(&txn, actor, sheet, status, transition, comment).await?;
        txn.commit().await?;

        self.after_transition(&sheet, &owner, transition);
        self.view(sheet).await
    }

    fn after_transition(
        &self,
        sheet: &timesheet::Model,
        owner: &employee::Model,
        transition: Transition,
    ) {
        let target = transition.target();
        counter!("timesheet_transitions_total", "to" => target.as_str()).increment(1);
        info!(
            timesheet_id = sheet.id,
            employee_id = owner.id,
            status = %target,
            "Timesheet status changed"
        );

        let notification = match transition {
            Transition::Submit => Notification::TimesheetSubmitted {
                timesheet_id: sheet.id,
                week_start: sheet.week_start,
                employee_name: owner.full_name.clone(),
                manager_email: sheet.manager_email.clone(),
            },
            Transition::Approve | Transition::Reject => Notification::TimesheetDecided {
                timesheet_id: sheet.id,
                week_start: sheet.week_start,
                owner_email: owner.email.clone(),
                status: target,
                manager_comment: sheet.manager_comment.clone(),
            },
        };
        self.notifier.request(notification);
    }
}

async fn apply_transition<C>(
    txn: &C,
    actor: &Actor,
    sheet: timesheet::Model,
    previous: TimesheetStatus,
    transition: Transition,
    comment: Option<String>,
) -> Result<timesheet::Model, DomainError>
where
    C: ConnectionTrait,
{
    let now: DateTimeWithTimeZone = Utc::now().into();
    let target = transition.target();
    guard_status(txn, sheet.id, transition.sources(), Some(target), |current| {
        transition.check_state(current)
    })
    .await?;

    let mut active = sheet.into_active_model();
    active.status = Set(target.as_str().to_string());
    match transition {
        Transition::Submit => {
            active.submitted_at = Set(Some(now));
        }
        Transition::Approve | Transition::Reject => {
            active.approved_by = Set(Some(actor.id));
            active.approved_at = Set(Some(now));
            if let Some(comment) = comment.as_ref() {
                active.manager_comment = Set(Some(comment.clone()));
            }
        }
    }
    let sheet = TimesheetRepository::new(txn).save(active).await?;

    AuditLogRepository::new(txn)
        .record(
            sheet.id,
            transition.event(),
            actor,
            json!({ "from": previous, "to": target, "comment": comment }),
        )
        .await?;
    Ok(sheet)
}
