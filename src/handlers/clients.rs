//! # Clients API Handlers

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
use crate::error::{ApiError, DomainError};
use crate::models::client;
use crate::policy::{Actor, Operation, Resource, ResourceType, can_mutate, can_view, scope_for};
use crate::repositories::{ClientChanges, ClientRepository, NewClient};
use crate::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientView {
    pub id: i32,
    #[schema(example = "Acme Corporation")]
    pub name: String,
    #[schema(example = "acme")]
    pub code: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

impl From<client::Model> for ClientView {
    fn from(model: client::Model) -> Self {
        ClientView {
            id: model.id,
            name: model.name,
            code: model.code,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateClientRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub code: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation_with(
            format!("{field} must not be empty"),
            json!({ "field": field }),
        ));
    }
    Ok(trimmed.to_string())
}

fn ensure_manages_clients(actor: &Actor, id: i32, operation: Operation) -> Result<(), DomainError> {
    if can_mutate(actor, &Resource::Client { id }, operation) {
        Ok(())
    } else {
        Err(DomainError::forbidden("Only administrators can manage clients"))
    }
}

async fn ensure_code_free(state: &AppState, code: &str) -> Result<(), DomainError> {
    if ClientRepository::new(&state.db)
        .find_by_code(code)
        .await?
        .is_some()
    {
        return Err(DomainError::Conflict("Client code already exists".to_string()));
    }
    Ok(())
}

/// Unique violations on insert or update still race past the pre-check.
fn code_conflict(error: sea_orm::DbErr) -> DomainError {
    match DomainError::from(error) {
        DomainError::Conflict(_) => DomainError::Conflict("Client code already exists".to_string()),
        other => other,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visible clients", body = [ClientView]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<ClientView>>, ApiError> {
    let scope = scope_for(&actor, ResourceType::Client);
    let clients = ClientRepository::new(&state.db).list(scope).await?;
    Ok(Json(clients.into_iter().map(ClientView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = ClientView),
        (status = 403, description = "Not visible to the caller", body = ApiError),
        (status = 404, description = "Unknown client", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<Json<ClientView>, ApiError> {
    let client = ClientRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Client", id))?;
    if !can_view(&actor, &Resource::Client { id: client.id }) {
        return Err(DomainError::forbidden("Not authorized to view this client").into());
    }
    Ok(Json(ClientView::from(client)))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    security(("bearer_auth" = [])),
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientView),
        (status = 400, description = "Validation failed or code already exists", body = ApiError),
        (status = 403, description = "Administrators only", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientView>), ApiError> {
    ensure_manages_clients(&actor, 0, Operation::Create)?;
    let name = required("name", &request.name)?;
    let code = required("code", &request.code)?;
    ensure_code_free(&state, &code).await?;

    let created = ClientRepository::new(&state.db)
        .create(NewClient { name, code })
        .await
        .map_err(code_conflict)?;
    tracing::info!(client_id = created.id, code = %created.code, "Client created");
    Ok((StatusCode::CREATED, Json(ClientView::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ClientView),
        (status = 400, description = "Validation failed or code already exists", body = ApiError),
        (status = 403, description = "Administrators only", body = ApiError),
        (status = 404, description = "Unknown client", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
    ApiJson(request): ApiJson<UpdateClientRequest>,
) -> Result<Json<ClientView>, ApiError> {
    ensure_manages_clients(&actor, id, Operation::Update)?;
    let repo = ClientRepository::new(&state.db);
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Client", id))?;

    let name = request
        .name
        .as_deref()
        .map(|name| required("name", name))
        .transpose()?;
    let code = match request.code.as_deref() {
        Some(code) => {
            let code = required("code", code)?;
            if code == existing.code {
                None
            } else {
                ensure_code_free(&state, &code).await?;
                Some(code)
            }
        }
        None => None,
    };

    let updated = repo
        .update(existing, ClientChanges { name, code })
        .await
        .map_err(code_conflict)?;
    Ok(Json(ClientView::from(updated)))
}

/// Deletes a client that no longer has employees
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 400, description = "Client still has employees", body = ApiError),
        (status = 403, description = "Administrators only", body = ApiError),
        (status = 404, description = "Unknown client", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    ensure_manages_clients(&actor, id, Operation::Delete)?;
    let repo = ClientRepository::new(&state.db);
    let client = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Client", id))?;

    let employees = repo.employee_count(client.id).await?;
    if employees > 0 {
        return Err(DomainError::Conflict(format!(
            "Client still has {employees} employee(s); reassign or delete them first"
        ))
        .into());
    }

    repo.delete(client.id).await?;
    tracing::info!(client_id = client.id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}
