//! # Timesheets API Handlers
//!
//! Thin wrappers over [`crate::workflow::TimesheetService`].

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use super::{ApiJson, DecisionRequest};
use crate::auth::CurrentActor;
use crate::error::{ApiError, validation_error};
use crate::intervals::DatedEntryPayload;
use crate::server::AppState;
use crate::workflow::{
    AuditEntryView, CreatedEntry, NewTimesheetRequest, TimesheetHours, TimesheetPatch,
    TimesheetView,
};

/// Approve and reject accept an empty body or `{"comment": ...}`.
pub(crate) fn decision_comment(body: &Bytes) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<DecisionRequest>(body)
        .map(|request| request.comment)
        .map_err(|error| {
            validation_error(
                &format!("Invalid JSON: {error}"),
                json!({ "field": "comment" }),
            )
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/timesheets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Timesheets visible to the caller, newest week first", body = [TimesheetView]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn list_timesheets(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TimesheetView>>, ApiError> {
    Ok(Json(state.timesheets().list(&actor).await?))
}

/// Creates a draft timesheet, optionally with its initial entries
#[utoipa::path(
    post,
    path = "/api/v1/timesheets",
    security(("bearer_auth" = [])),
    request_body = NewTimesheetRequest,
    responses(
        (status = 201, description = "Timesheet created in draft", body = TimesheetView),
        (status = 400, description = "Validation failed, including interval rejections", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown owner", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn create_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<NewTimesheetRequest>,
) -> Result<(StatusCode, Json<TimesheetView>), ApiError> {
    let view = state.timesheets().create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/timesheets/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet with entries and hours", body = TimesheetView),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn get_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<TimesheetView>, ApiError> {
    Ok(Json(state.timesheets().get(&actor, id).await?))
}

/// Patches `comment`, `project` and/or `status`
#[utoipa::path(
    put,
    path = "/api/v1/timesheets/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    request_body = TimesheetPatch,
    responses(
        (status = 200, description = "Timesheet updated", body = TimesheetView),
        (status = 400, description = "Unknown field, illegal status or frozen timesheet", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn update_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    ApiJson(patch): ApiJson<TimesheetPatch>,
) -> Result<Json<TimesheetView>, ApiError> {
    Ok(Json(state.timesheets().update(&actor, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/timesheets/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    responses(
        (status = 204, description = "Timesheet deleted"),
        (status = 400, description = "Timesheet already decided", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn delete_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.timesheets().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a draft timesheet to `submitted` and notifies the manager
#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/submit",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet submitted", body = TimesheetView),
        (status = 400, description = "Timesheet is not a draft", body = ApiError),
        (status = 403, description = "Only the owner can submit", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn submit_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<TimesheetView>, ApiError> {
    Ok(Json(state.timesheets().submit(&actor, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/approve",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    request_body(content = DecisionRequest, description = "Optional manager comment"),
    responses(
        (status = 200, description = "Timesheet approved", body = TimesheetView),
        (status = 400, description = "Timesheet is not awaiting a decision", body = ApiError),
        (status = 403, description = "Caller is not the addressed manager", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn approve_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<TimesheetView>, ApiError> {
    let comment = decision_comment(&body)?;
    Ok(Json(state.timesheets().approve(&actor, id, comment).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/reject",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    request_body(content = DecisionRequest, description = "Reason for the rejection"),
    responses(
        (status = 200, description = "Timesheet rejected", body = TimesheetView),
        (status = 400, description = "Timesheet is not awaiting a decision", body = ApiError),
        (status = 403, description = "Caller is not the addressed manager", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn reject_timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<TimesheetView>, ApiError> {
    let comment = decision_comment(&body)?;
    Ok(Json(state.timesheets().reject(&actor, id, comment).await?))
}

/// Adds one entry with its breaks after interval validation
#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/entries",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    request_body = DatedEntryPayload,
    responses(
        (status = 201, description = "Entry recorded", body = CreatedEntry),
        (status = 400, description = "Interval rejected or timesheet frozen", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn add_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<DatedEntryPayload>,
) -> Result<(StatusCode, Json<CreatedEntry>), ApiError> {
    let (date, entry) = payload.into_parts();
    let created = state
        .timesheets()
        .add_entry(&actor, id, date, entry)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/timesheets/{id}/entries/{entry_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Timesheet id"),
        ("entry_id" = i32, Path, description = "Entry id")
    ),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 400, description = "Timesheet frozen", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown timesheet or entry", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, entry_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    state.timesheets().delete_entry(&actor, id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Regular, overtime and total hours, overall and per day
#[utoipa::path(
    get,
    path = "/api/v1/timesheets/{id}/hours",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Hours summary", body = TimesheetHours),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn timesheet_hours(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<TimesheetHours>, ApiError> {
    Ok(Json(state.timesheets().hours(&actor, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/timesheets/{id}/audit",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Lifecycle events, oldest first", body = [AuditEntryView]),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown timesheet", body = ApiError)
    ),
    tag = "timesheets"
)]
pub async fn timesheet_audit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<Vec<AuditEntryView>>, ApiError> {
    Ok(Json(state.timesheets().audit_trail(&actor, id).await?))
}
