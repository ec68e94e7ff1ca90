//! # Time-Off Workflow
//!
//! `pending -> {approved, rejected}`. Only the owning consultant edits or
//! withdraws a request, and only while it is pending.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{authorize, manager_address, ownership};
use crate::error::DomainError;
use crate::models::{RoleKind, TimeOffKind, TimeOffStatus, employee, time_off};
use crate::notify::{Notification, NotificationQueue};
use crate::policy::{Actor, Operation, Resource, ResourceType, can_mutate, can_view, scope_for};
use crate::repositories::{EmployeeRepository, NewTimeOff, TimeOffRepository};

/// Decisions a manager can take on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn operation(self) -> Operation {
        match self {
            Decision::Approve => Operation::Approve,
            Decision::Reject => Operation::Reject,
        }
    }

    fn target(self) -> TimeOffStatus {
        match self {
            Decision::Approve => TimeOffStatus::Approved,
            Decision::Reject => TimeOffStatus::Rejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        }
    }
}

/// Requests leave `pending` exactly once.
pub fn ensure_pending(status: TimeOffStatus, action: &str) -> Result<(), DomainError> {
    match status {
        TimeOffStatus::Pending => Ok(()),
        TimeOffStatus::Approved | TimeOffStatus::Rejected => Err(DomainError::validation_with(
            format!("Only pending requests can be {action}"),
            json!({ "status": status }),
        )),
    }
}

fn ensure_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), DomainError> {
    if end_date < start_date {
        return Err(DomainError::validation_with(
            "end_date must not be before start_date",
            json!({ "field": "end_date", "start_date": start_date, "end_date": end_date }),
        ));
    }
    Ok(())
}

/// Conditional write inside `txn` that only matches a pending request. When
/// the request has been decided meanwhile, the failure names `action`.
async fn guard_pending<C: ConnectionTrait>(
    txn: &C,
    id: i32,
    target: Option<TimeOffStatus>,
    action: &str,
) -> Result<(), DomainError> {
    let repo = TimeOffRepository::new(txn);
    if repo.guard_pending(id, target).await? {
        return Ok(());
    }

    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Time-off request", id))?;
    ensure_pending(current.status()?, action)?;
    Err(DomainError::validation(
        "Time-off request changed while the request was processed",
    ))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewTimeOffRequest {
    #[schema(value_type = String, format = Date, example = "2025-02-03")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-02-07")]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TimeOffKind,
    pub manager_email: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TimeOffPatch {
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TimeOffKind>,
    pub manager_email: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimeOffView {
    pub id: i32,
    pub employee_id: i32,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TimeOffKind,
    pub status: TimeOffStatus,
    pub manager_email: String,
    pub comment: Option<String>,
    pub manager_comment: Option<String>,
    pub approved_by: Option<i32>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub approved_at: Option<DateTimeWithTimeZone>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

impl TryFrom<time_off::Model> for TimeOffView {
    type Error = DomainError;

    fn try_from(model: time_off::Model) -> Result<Self, Self::Error> {
        Ok(TimeOffView {
            kind: model.kind()?,
            status: model.status()?,
            id: model.id,
            employee_id: model.employee_id,
            start_date: model.start_date,
            end_date: model.end_date,
            manager_email: model.manager_email,
            comment: model.comment,
            manager_comment: model.manager_comment,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub struct TimeOffService<'a> {
    db: &'a DatabaseConnection,
    notifier: &'a NotificationQueue,
}

impl<'a> TimeOffService<'a> {
    pub fn new(db: &'a DatabaseConnection, notifier: &'a NotificationQueue) -> Self {
        Self { db, notifier }
    }

    async fn load(&self, id: i32) -> Result<(time_off::Model, employee::Model), DomainError> {
        TimeOffRepository::new(self.db)
            .find_with_owner(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Time-off request", id))
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<TimeOffView>, DomainError> {
        let scope = scope_for(actor, ResourceType::TimeOff);
        TimeOffRepository::new(self.db)
            .list(scope)
            .await?
            .into_iter()
            .map(TimeOffView::try_from)
            .collect()
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> Result<TimeOffView, DomainError> {
        let (request, owner) = self.load(id).await?;
        let resource = Resource::TimeOff(ownership(&owner, &request.manager_email));
        authorize(
            can_view(actor, &resource),
            "Not authorized to view this time-off request",
        )?;
        TimeOffView::try_from(request)
    }

    #[instrument(skip_all, fields(actor_id = actor.id))]
    pub async fn create(
        &self,
        actor: &Actor,
        request: NewTimeOffRequest,
    ) -> Result<TimeOffView, DomainError> {
        authorize(
            actor.role.kind() == RoleKind::Consultant,
            "Only consultants can request time off",
        )?;
        let owner = EmployeeRepository::new(self.db)
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Employee", actor.id))?;
        let manager_email = manager_address(&request.manager_email)?;
        let resource = Resource::TimeOff(ownership(&owner, &manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::Create),
            "Not allowed to request time off",
        )?;
        ensure_range(request.start_date, request.end_date)?;

        let created = TimeOffRepository::new(self.db)
            .create(NewTimeOff {
                employee_id: owner.id,
                start_date: request.start_date,
                end_date: request.end_date,
                kind: request.kind,
                manager_email,
                comment: request.comment,
            })
            .await?;

        counter!("time_off_requests_total").increment(1);
        info!(
            time_off_id = created.id,
            employee_id = owner.id,
            "Time-off requested"
        );
        self.notifier.request(Notification::TimeOffRequested {
            time_off_id: created.id,
            employee_name: owner.full_name,
            manager_email: created.manager_email.clone(),
            start_date: created.start_date,
            end_date: created.end_date,
        });
        TimeOffView::try_from(created)
    }

    #[instrument(skip_all, fields(actor_id = actor.id, time_off_id = id))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        patch: TimeOffPatch,
    ) -> Result<TimeOffView, DomainError> {
        let (request, owner) = self.load(id).await?;
        let resource = Resource::TimeOff(ownership(&owner, &request.manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::Update),
            "Only the owner can change a time-off request",
        )?;
        ensure_pending(request.status()?, "updated")?;

        let start_date = patch.start_date.unwrap_or(request.start_date);
        let end_date = patch.end_date.unwrap_or(request.end_date);
        ensure_range(start_date, end_date)?;
        let manager_email = patch
            .manager_email
            .as_deref()
            .map(manager_address)
            .transpose()?;

        let mut active = request.into_active_model();
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        if let Some(kind) = patch.kind {
            active.kind = Set(kind.as_str().to_string());
        }
        if let Some(manager_email) = manager_email {
            active.manager_email = Set(manager_email);
        }
        if let Some(comment) = patch.comment {
            active.comment = Set(Some(comment));
        }
        let txn = self.db.begin().await?;
        guard_pending(&txn, id, None, "updated").await?;
        let updated = TimeOffRepository::new(&txn).save(active).await?;
        txn.commit().await?;
        TimeOffView::try_from(updated)
    }

    #[instrument(skip_all, fields(actor_id = actor.id, time_off_id = id))]
    pub async fn delete(&self, actor: &Actor, id: i32) -> Result<(), DomainError> {
        let (request, owner) = self.load(id).await?;
        let resource = Resource::TimeOff(ownership(&owner, &request.manager_email));
        authorize(
            can_mutate(actor, &resource, Operation::Delete),
            "Only the owner can delete a time-off request",
        )?;
        ensure_pending(request.status()?, "deleted")?;

        let txn = self.db.begin().await?;
        guard_pending(&txn, request.id, None, "deleted").await?;
        TimeOffRepository::new(&txn).delete(request.id).await?;
        txn.commit().await?;
        info!(time_off_id = request.id, employee_id = owner.id, "Time-off request deleted");
        Ok(())
    }

    pub async fn approve(
        &self,
        actor: &Actor,
        id: i32,
        comment: Option<String>,
    ) -> Result<TimeOffView, DomainError> {
        self.decide(actor, id, Decision::Approve, comment).await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: i32,
        comment: Option<String>,
    ) -> Result<TimeOffView, DomainError> {
        self.decide(actor, id, Decision::Reject, comment).await
    }

    #[instrument(skip_all, fields(actor_id = actor.id, time_off_id = id, ?decision))]
    async fn decide(
        &self,
        actor: &Actor,
        id: i32,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<TimeOffView, DomainError> {
        let (request, owner) = self.load(id).await?;
        let resource = Resource::TimeOff(ownership(&owner, &request.manager_email));
        authorize(
            can_mutate(actor, &resource, decision.operation()),
            "Only the manager this request is addressed to can decide it",
        )?;
        ensure_pending(request.status()?, decision.verb())?;

        let target = decision.target();
        let mut active = request.into_active_model();
        active.status = Set(target.as_str().to_string());
        active.approved_by = Set(Some(actor.id));
        active.approved_at = Set(Some(Utc::now().into()));
        if let Some(comment) = comment {
            active.manager_comment = Set(Some(comment));
        }
        let txn = self.db.begin().await?;
        guard_pending(&txn, id, Some(target), decision.verb()).await?;
        let decided = TimeOffRepository::new(&txn).save(active).await?;
        txn.commit().await?;

        counter!("time_off_decisions_total", "to" => target.as_str()).increment(1);
        info!(
            time_off_id = decided.id,
            employee_id = owner.id,
            status = %target,
            "Time-off request decided"
        );
        self.notifier.request(Notification::TimeOffDecided {
            time_off_id: decided.id,
            owner_email: owner.email,
            status: target,
            start_date: decided.start_date,
            end_date: decided.end_date,
            manager_comment: decided.manager_comment.clone(),
        });
        TimeOffView::try_from(decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[test]
    fn decided_requests_cannot_be_decided_again() {
        assert!(ensure_pending(TimeOffStatus::Pending, "approved").is_ok());
        let err = ensure_pending(TimeOffStatus::Approved, "approved").unwrap_err();
        assert_eq!(err.to_string(), "Only pending requests can be approved");
        assert!(ensure_pending(TimeOffStatus::Rejected, "updated").is_err());
    }

    #[test]
    fn single_day_leave_is_a_valid_range() {
        assert!(ensure_range(date(3), date(3)).is_ok());
        assert!(ensure_range(date(3), date(7)).is_ok());
        assert!(matches!(
            ensure_range(date(7), date(3)),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn request_uses_type_on_the_wire() {
        let request: NewTimeOffRequest = serde_json::from_value(json!({
            "start_date": "2025-02-03",
            "end_date": "2025-02-04",
            "type": "sick",
            "manager_email": "boss@acme.example"
        }))
        .unwrap();
        assert_eq!(request.kind, TimeOffKind::Sick);
        assert!(request.comment.is_none());

        let unknown = serde_json::from_value::<TimeOffPatch>(json!({ "status": "approved" }));
        assert!(unknown.is_err());
    }
}
