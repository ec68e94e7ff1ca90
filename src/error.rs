//! # Error Handling
//!
//! Two layers. [`DomainError`] is what services and workflows return; it
//! mirrors the failure taxonomy of the service (authentication, authorization,
//! not found, validation, conflict). [`ApiError`] is the problem+json body
//! sent to clients, carrying the request trace id.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use utoipa::ToSchema;

use crate::intervals::IntervalRejection;
use crate::models::UnknownVariant;
use crate::policy::RoleInvariantError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Trace id of the running request, or a short correlation id outside one.
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        if let Some(trace_id) = self.trace_id.as_deref()
            && let Ok(header_value) = HeaderValue::from_str(trace_id)
        {
            headers.insert("x-trace-id", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code = code.as_ref();
        code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code)
    })
}

/// Failures raised by services and workflows.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing, malformed or expired credential
    #[error("{0}")]
    Authentication(String),
    /// The access policy or a workflow role check refused the operation
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Malformed input, interval rejection or illegal state transition
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(#[source] sea_orm::DbErr),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        DomainError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(what: &str, id: i32) -> Self {
        DomainError::NotFound(format!("{what} {id} not found"))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DomainError::Forbidden(message.into())
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return DomainError::Conflict("Resource already exists".to_string());
        }
        DomainError::Storage(error)
    }
}

impl From<IntervalRejection> for DomainError {
    fn from(rejection: IntervalRejection) -> Self {
        DomainError::Validation {
            message: rejection.to_string(),
            details: Some(rejection.details()),
        }
    }
}

/// A stored status or role string the service does not recognise.
impl From<UnknownVariant> for DomainError {
    fn from(error: UnknownVariant) -> Self {
        tracing::error!(%error, "Unrecognised value in storage");
        DomainError::Storage(sea_orm::DbErr::Type(error.to_string()))
    }
}

impl From<RoleInvariantError> for DomainError {
    fn from(error: RoleInvariantError) -> Self {
        DomainError::validation_with(error.to_string(), json!({ "field": "role" }))
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Authentication(message) => unauthorized(Some(&message)),
            DomainError::Forbidden(message) => forbidden(Some(&message)),
            DomainError::NotFound(message) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
            }
            DomainError::Validation { message, details } => {
                let err = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message);
                match details {
                    Some(details) => err.with_details(details),
                    None => err,
                }
            }
            DomainError::Conflict(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "CONFLICT", message)
            }
            DomainError::Storage(error) => storage_error(error),
        }
    }
}

fn storage_error(error: sea_orm::DbErr) -> ApiError {
    match error {
        sea_orm::DbErr::RecordNotFound(record) => ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Record not found: {}", record),
        ),
        sea_orm::DbErr::Conn(connection_err) => {
            tracing::error!("Database connection error: {:?}", connection_err);
            ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Database service unavailable",
            )
            .with_retry_after(5)
        }
        other => {
            tracing::error!("Database error: {:?}", other);
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Database error occurred",
            )
        }
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        DomainError::from(error).into()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err.body_text()),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err.body_text()),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            rejection.body_text(),
        )
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Insufficient permissions");
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::wire::wall_clock;

    #[test]
    fn api_error_basic() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error");

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error"));
        assert_eq!(error.details, None);
        assert_eq!(error.retry_after, None);
    }

    #[test]
    fn content_type_and_trace_headers() {
        let response =
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error").into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
        assert!(response.headers().get("x-trace-id").is_some());
    }

    #[test]
    fn trace_id_falls_back_to_correlation_id() {
        let error = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", "x");
        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (
                DomainError::Authentication("bad token".into()),
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                DomainError::forbidden("no"),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (
                DomainError::not_found("Timesheet", 4),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                DomainError::validation("Only pending requests can be approved"),
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
            ),
            (
                DomainError::Conflict("Email already registered".into()),
                StatusCode::BAD_REQUEST,
                "CONFLICT",
            ),
        ];

        for (domain, status, code) in cases {
            let api: ApiError = domain.into();
            assert_eq!(api.status, status);
            assert_eq!(api.code.as_ref(), code);
        }
    }

    #[test]
    fn not_found_message_names_the_record() {
        let api: ApiError = DomainError::not_found("Timesheet", 4).into();
        assert_eq!(api.message.as_ref(), "Timesheet 4 not found");
    }

    #[test]
    fn interval_rejection_carries_reason_details() {
        let rejection = IntervalRejection::OverlapsExisting {
            existing_start: wall_clock::parse("09:00").unwrap(),
            existing_end: wall_clock::parse("12:00").unwrap(),
        };
        let api: ApiError = DomainError::from(rejection).into();

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["reason"], "overlaps_existing_entry");
        assert_eq!(details["conflict"]["out_time"], "12:00");
        assert!(api.message.contains("09:00"));
    }

    #[test]
    fn record_not_found_maps_to_404() {
        let api: ApiError = sea_orm::DbErr::RecordNotFound("employee".into()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn opaque_storage_errors_are_500() {
        let api: ApiError = sea_orm::DbErr::Custom("boom".into()).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message.as_ref(), "Database error occurred");
    }

    #[test]
    fn validation_helper_keeps_details() {
        let err = validation_error("Validation failed", json!({"email": "required"}));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details, Some(Box::new(json!({"email": "required"}))));
    }
}
