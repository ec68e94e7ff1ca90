//! # Time-Off API Handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::ApiJson;
use super::timesheets::decision_comment;
use crate::auth::CurrentActor;
use crate::error::ApiError;
use crate::server::AppState;
use crate::workflow::{NewTimeOffRequest, TimeOffPatch, TimeOffView};

#[utoipa::path(
    get,
    path = "/api/v1/time_off",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Requests visible to the caller", body = [TimeOffView]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn list_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<TimeOffView>>, ApiError> {
    Ok(Json(state.time_off().list(&actor).await?))
}

/// Files a leave request addressed to a manager
#[utoipa::path(
    post,
    path = "/api/v1/time_off",
    security(("bearer_auth" = [])),
    request_body = NewTimeOffRequest,
    responses(
        (status = 201, description = "Request created in pending", body = TimeOffView),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Only consultants can request time off", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn create_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<NewTimeOffRequest>,
) -> Result<(StatusCode, Json<TimeOffView>), ApiError> {
    let view = state.time_off().create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/time_off/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Time-off request id")),
    responses(
        (status = 200, description = "Time-off request", body = TimeOffView),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown request", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn get_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<TimeOffView>, ApiError> {
    Ok(Json(state.time_off().get(&actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/time_off/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Time-off request id")),
    request_body = TimeOffPatch,
    responses(
        (status = 200, description = "Request updated", body = TimeOffView),
        (status = 400, description = "Validation failed or request no longer pending", body = ApiError),
        (status = 403, description = "Only the owner can edit", body = ApiError),
        (status = 404, description = "Unknown request", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn update_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    ApiJson(patch): ApiJson<TimeOffPatch>,
) -> Result<Json<TimeOffView>, ApiError> {
    Ok(Json(state.time_off().update(&actor, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/time_off/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Time-off request id")),
    responses(
        (status = 204, description = "Request withdrawn"),
        (status = 400, description = "Request no longer pending", body = ApiError),
        (status = 403, description = "Only the owner can withdraw", body = ApiError),
        (status = 404, description = "Unknown request", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn delete_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.time_off().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/time_off/{id}/approve",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Time-off request id")),
    request_body(content = super::DecisionRequest, description = "Optional manager comment"),
    responses(
        (status = 200, description = "Request approved", body = TimeOffView),
        (status = 400, description = "Request no longer pending", body = ApiError),
        (status = 403, description = "Caller is not the addressed manager", body = ApiError),
        (status = 404, description = "Unknown request", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn approve_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<TimeOffView>, ApiError> {
    let comment = decision_comment(&body)?;
    Ok(Json(state.time_off().approve(&actor, id, comment).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/time_off/{id}/reject",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Time-off request id")),
    request_body(content = super::DecisionRequest, description = "Reason for the rejection"),
    responses(
        (status = 200, description = "Request rejected", body = TimeOffView),
        (status = 400, description = "Request no longer pending", body = ApiError),
        (status = 403, description = "Caller is not the addressed manager", body = ApiError),
        (status = 404, description = "Unknown request", body = ApiError)
    ),
    tag = "time_off"
)]
pub async fn reject_time_off(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<TimeOffView>, ApiError> {
    let comment = decision_comment(&body)?;
    Ok(Json(state.time_off().reject(&actor, id, comment).await?))
}
