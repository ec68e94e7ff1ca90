//! # Employees API Handlers
//!
//! Administrators manage every account. Managers manage the accounts of their
//! own client and can neither promote to `dew_admin` nor move an account to
//! another client. Consultants only see themselves.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::ApiJson;
use crate::auth::CurrentActor;
use crate::credentials::hash_password_blocking;
use crate::error::{ApiError, DomainError};
use crate::models::{RoleKind, employee};
use crate::policy::{Operation, Resource, ResourceType, Role, can_mutate, can_view, scope_for};
use crate::repositories::{ClientRepository, EmployeeChanges, EmployeeRepository, NewEmployee};
use crate::server::AppState;
use crate::workflow::email_address;

pub(crate) const MIN_PASSWORD_LENGTH: usize = 6;

/// Employee account as returned by the API (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeView {
    pub id: i32,
    #[schema(example = "Ada Lovelace")]
    pub full_name: String,
    #[schema(example = "ada@acme.example")]
    pub email: String,
    pub role: RoleKind,
    pub client_id: Option<i32>,
    pub is_active: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

impl TryFrom<employee::Model> for EmployeeView {
    type Error = DomainError;

    fn try_from(model: employee::Model) -> Result<Self, Self::Error> {
        Ok(EmployeeView {
            role: model.role_kind()?,
            id: model.id,
            full_name: model.full_name,
            email: model.email,
            client_id: model.client_id,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub email: String,
    /// Initial password (minimum 6 characters)
    pub password: String,
    pub role: RoleKind,
    /// Required for every role except `dew_admin`
    pub client_id: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub role: Option<RoleKind>,
    pub client_id: Option<i32>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

fn employee_resource(model: &employee::Model) -> Result<Resource<'static>, DomainError> {
    Ok(Resource::Employee {
        id: model.id,
        client_id: model.client_id,
        role: model.role_kind()?,
    })
}

pub(crate) fn validate_full_name(full_name: &str) -> Result<String, DomainError> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation_with(
            "full_name must not be empty",
            json!({ "field": "full_name" }),
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::validation_with(
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
            json!({ "field": "password", "min_length": MIN_PASSWORD_LENGTH }),
        ));
    }
    Ok(())
}

/// The referenced client must exist.
pub(crate) async fn ensure_client_exists(
    state: &AppState,
    client_id: Option<i32>,
) -> Result<(), DomainError> {
    if let Some(client_id) = client_id
        && ClientRepository::new(&state.db)
            .find_by_id(client_id)
            .await?
            .is_none()
    {
        return Err(DomainError::validation_with(
            "Invalid client ID",
            json!({ "field": "client_id", "value": client_id }),
        ));
    }
    Ok(())
}

pub(crate) async fn ensure_email_free(state: &AppState, email: &str) -> Result<(), DomainError> {
    if EmployeeRepository::new(&state.db)
        .find_by_email(email)
        .await?
        .is_some()
    {
        return Err(DomainError::Conflict("Email already registered".to_string()));
    }
    Ok(())
}

/// Lists the employees visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visible employees", body = [EmployeeView]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<EmployeeView>>, ApiError> {
    let scope = scope_for(&actor, ResourceType::Employee);
    let employees = EmployeeRepository::new(&state.db).list(scope).await?;
    let views = employees
        .into_iter()
        .map(EmployeeView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = EmployeeView),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown employee", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<EmployeeView>, ApiError> {
    let employee = EmployeeRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Employee", id))?;
    if !can_view(&actor, &employee_resource(&employee)?) {
        return Err(DomainError::forbidden("Not authorized to view this employee").into());
    }
    Ok(Json(EmployeeView::try_from(employee)?))
}

/// Creates an employee account
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    security(("bearer_auth" = [])),
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = EmployeeView),
        (status = 400, description = "Validation failed or email already registered", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeView>), ApiError> {
    let target = Resource::Employee {
        id: 0,
        client_id: request.client_id,
        role: request.role,
    };
    if !can_mutate(&actor, &target, Operation::Create) {
        return Err(DomainError::forbidden("Not authorized to create this employee").into());
    }

    let role = Role::from_parts(request.role, request.client_id).map_err(DomainError::from)?;
    let full_name = validate_full_name(&request.full_name)?;
    let email = email_address(&request.email, "email")?;
    validate_password(&request.password)?;
    ensure_client_exists(&state, role.client_id()).await?;
    ensure_email_free(&state, &email).await?;

    let password_hash = hash_password_blocking(request.password)
        .await
        .map_err(anyhow::Error::from)?;
    let created = EmployeeRepository::new(&state.db)
        .create(NewEmployee {
            full_name,
            email,
            password_hash,
            role: role.kind(),
            client_id: role.client_id(),
            is_active: request.is_active,
        })
        .await
        .map_err(DomainError::from)?;

    tracing::info!(
        employee_id = created.id,
        created_by = actor.id,
        role = %role.kind(),
        "Employee created"
    );
    Ok((StatusCode::CREATED, Json(EmployeeView::try_from(created)?)))
}

/// Updates an employee. The role/client pairing is re-validated on every change.
#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeView),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown employee", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    ApiJson(request): ApiJson<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeView>, ApiError> {
    let repo = EmployeeRepository::new(&state.db);
    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Employee", id))?;
    if !can_mutate(&actor, &employee_resource(&current)?, Operation::Update) {
        return Err(DomainError::forbidden("Not authorized to update this employee").into());
    }

    let role = request.role.unwrap_or(current.role_kind().map_err(DomainError::from)?);
    let client_id = match role {
        RoleKind::DewAdmin => request.client_id,
        RoleKind::Consultant | RoleKind::ClientManager => request.client_id.or(current.client_id),
    };
    let after = Resource::Employee {
        id,
        client_id,
        role,
    };
    if !can_mutate(&actor, &after, Operation::Update) {
        let message = if role == RoleKind::DewAdmin {
            "Cannot promote to Dew Admin"
        } else {
            "Cannot assign to another client"
        };
        return Err(DomainError::forbidden(message).into());
    }

    let role = Role::from_parts(role, client_id).map_err(DomainError::from)?;
    if role.client_id() != current.client_id {
        ensure_client_exists(&state, role.client_id()).await?;
    }
    let full_name = request
        .full_name
        .as_deref()
        .map(validate_full_name)
        .transpose()?;
    let password_hash = match request.password {
        Some(password) => {
            validate_password(&password)?;
            Some(
                hash_password_blocking(password)
                    .await
                    .map_err(anyhow::Error::from)?,
            )
        }
        None => None,
    };

    let updated = repo
        .update(
            current,
            EmployeeChanges {
                full_name,
                role: role.kind(),
                client_id: role.client_id(),
                is_active: request.is_active,
                password_hash,
            },
        )
        .await?;
    tracing::info!(employee_id = updated.id, updated_by = actor.id, "Employee updated");
    Ok(Json(EmployeeView::try_from(updated)?))
}

/// Deletes an employee together with their timesheets and leave requests
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Unknown employee", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let repo = EmployeeRepository::new(&state.db);
    let employee = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Employee", id))?;
    if !can_mutate(&actor, &employee_resource(&employee)?, Operation::Delete) {
        return Err(DomainError::forbidden("Not authorized to delete this employee").into());
    }

    repo.delete_cascade(employee.id).await?;
    tracing::info!(employee_id = employee.id, deleted_by = actor.id, "Employee deleted");
    Ok(StatusCode::NO_CONTENT)
}
