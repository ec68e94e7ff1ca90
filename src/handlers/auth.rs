//! # Authentication API Handlers
//!
//! Login, self-service signup and the current-user lookup.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ApiJson;
use super::employees::{
    EmployeeView, ensure_client_exists, ensure_email_free, validate_full_name, validate_password,
};
use crate::auth::CurrentActor;
use crate::credentials::{hash_password_blocking, verify_password_blocking};
use crate::error::{ApiError, DomainError, unauthorized};
use crate::models::{RoleKind, employee};
use crate::policy::Role;
use crate::repositories::{EmployeeRepository, NewEmployee};
use crate::server::AppState;
use crate::workflow::email_address;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[schema(example = "ada@acme.example")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    /// Minimum 6 characters
    pub password: String,
    pub full_name: String,
    pub role: RoleKind,
    /// Required for every role except `dew_admin`
    pub client_id: Option<i32>,
}

/// Bearer token issued on login and signup
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Token lifetime in seconds
    #[schema(example = 1800)]
    pub expires_in: i64,
    pub user: EmployeeView,
}

fn issue_token(state: &AppState, employee: employee::Model) -> Result<TokenResponse, ApiError> {
    let access_token = state
        .tokens
        .issue(employee.id)
        .map_err(anyhow::Error::from)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.tokens.ttl_seconds(),
        user: EmployeeView::try_from(employee)?,
    })
}

/// Exchanges email and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenResponse),
        (status = 400, description = "Malformed request", body = ApiError),
        (status = 401, description = "Wrong credentials or disabled account", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let employee = EmployeeRepository::new(&state.db)
        .find_by_email(&request.email)
        .await?;

    let Some(employee) = employee else {
        tracing::info!("Login attempt for unknown email");
        return Err(unauthorized(Some("Incorrect email or password")));
    };

    let matches = verify_password_blocking(request.password, employee.password_hash.clone())
        .await
        .unwrap_or_else(|error| {
            tracing::error!(employee_id = employee.id, %error, "Password check failed");
            false
        });
    if !matches {
        tracing::info!(employee_id = employee.id, "Login attempt with wrong password");
        return Err(unauthorized(Some("Incorrect email or password")));
    }
    if !employee.is_active {
        return Err(unauthorized(Some("Account is disabled")));
    }

    tracing::info!(employee_id = employee.id, "Employee logged in");
    Ok(Json(issue_token(&state, employee)?))
}

/// Registers an account and returns a bearer token for it.
///
/// A `dew_admin` account can only be created this way while none exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Validation failed or email already registered", body = ApiError),
        (status = 403, description = "Administrator signup is closed", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let role = Role::from_parts(request.role, request.client_id).map_err(DomainError::from)?;
    let email = email_address(&request.email, "email")?;
    let full_name = validate_full_name(&request.full_name)?;
    validate_password(&request.password)?;

    let repo = EmployeeRepository::new(&state.db);
    if role == Role::DewAdmin && repo.count_with_role(RoleKind::DewAdmin).await? > 0 {
        return Err(DomainError::forbidden(
            "Administrator accounts can only be created by an administrator",
        )
        .into());
    }
    ensure_client_exists(&state, role.client_id()).await?;
    ensure_email_free(&state, &email).await?;

    let password_hash = hash_password_blocking(request.password)
        .await
        .map_err(anyhow::Error::from)?;
    let created = repo
        .create(NewEmployee {
            full_name,
            email,
            password_hash,
            role: role.kind(),
            client_id: role.client_id(),
            is_active: true,
        })
        .await?;

    tracing::info!(employee_id = created.id, role = %role.kind(), "Employee signed up");
    Ok((StatusCode::CREATED, Json(issue_token(&state, created)?)))
}

/// Returns the authenticated employee
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current employee", body = EmployeeView),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<EmployeeView>, ApiError> {
    let employee = EmployeeRepository::new(&state.db)
        .find_by_id(actor.id)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid or expired token")))?;
    Ok(Json(EmployeeView::try_from(employee)?))
}
