//! # Server Configuration
//!
//! Router assembly, shared state and the serve loop for the time-tracking API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_actor;
use crate::config::AppConfig;
use crate::credentials::TokenKeys;
use crate::handlers::{self, auth, clients, dashboard, employees, time_off, timesheets};
use crate::notify::NotificationQueue;
use crate::telemetry::{TRACE_ID_HEADER, trace_context_middleware};
use crate::workflow::{DayLocks, TimeOffService, TimesheetService};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub notifier: NotificationQueue,
    pub day_locks: DayLocks,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, notifier: NotificationQueue) -> Self {
        let tokens = TokenKeys::from_config(&config);
        Self {
            config: Arc::new(config),
            db,
            notifier,
            day_locks: DayLocks::default(),
            tokens,
        }
    }

    pub fn timesheets(&self) -> TimesheetService<'_> {
        TimesheetService::new(&self.db, &self.notifier, &self.day_locks)
    }

    pub fn time_off(&self) -> TimeOffService<'_> {
        TimeOffService::new(&self.db, &self.notifier)
    }
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/employees/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/{id}",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/timesheets",
            get(timesheets::list_timesheets).post(timesheets::create_timesheet),
        )
        .route(
            "/timesheets/{id}",
            get(timesheets::get_timesheet)
                .put(timesheets::update_timesheet)
                .delete(timesheets::delete_timesheet),
        )
        .route("/timesheets/{id}/submit", post(timesheets::submit_timesheet))
        .route("/timesheets/{id}/approve", post(timesheets::approve_timesheet))
        .route("/timesheets/{id}/reject", post(timesheets::reject_timesheet))
        .route("/timesheets/{id}/entries", post(timesheets::add_entry))
        .route(
            "/timesheets/{id}/entries/{entry_id}",
            delete(timesheets::delete_entry),
        )
        .route("/timesheets/{id}/hours", get(timesheets::timesheet_hours))
        .route("/timesheets/{id}/audit", get(timesheets::timesheet_audit))
        .route(
            "/time_off",
            get(time_off::list_time_off).post(time_off::create_time_off),
        )
        .route(
            "/time_off/{id}",
            get(time_off::get_time_off)
                .put(time_off::update_time_off)
                .delete(time_off::delete_time_off),
        )
        .route("/time_off/{id}/approve", post(time_off::approve_time_off))
        .route("/time_off/{id}/reject", post(time_off::reject_time_off))
        .route("/dashboard/summary", get(dashboard::dashboard_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_actor));

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .merge(protected)
}

/// Browser origins allowed by configuration; none means no CORS headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([TRACE_ID_HEADER.clone()])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api_routes(&state))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Serves the API until `shutdown` is cancelled
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .context("Invalid server address")?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server terminated with an error")?;

    tracing::info!("Server stopped");
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::login,
        crate::handlers::auth::signup,
        crate::handlers::auth::me,
        crate::handlers::employees::list_employees,
        crate::handlers::employees::get_employee,
        crate::handlers::employees::create_employee,
        crate::handlers::employees::update_employee,
        crate::handlers::employees::delete_employee,
        crate::handlers::clients::list_clients,
        crate::handlers::clients::get_client,
        crate::handlers::clients::create_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,
        crate::handlers::timesheets::list_timesheets,
        crate::handlers::timesheets::create_timesheet,
        crate::handlers::timesheets::get_timesheet,
        crate::handlers::timesheets::update_timesheet,
        crate::handlers::timesheets::delete_timesheet,
        crate::handlers::timesheets::submit_timesheet,
        crate::handlers::timesheets::approve_timesheet,
        crate::handlers::timesheets::reject_timesheet,
        crate::handlers::timesheets::add_entry,
        crate::handlers::timesheets::delete_entry,
        crate::handlers::timesheets::timesheet_hours,
        crate::handlers::timesheets::timesheet_audit,
        crate::handlers::time_off::list_time_off,
        crate::handlers::time_off::create_time_off,
        crate::handlers::time_off::get_time_off,
        crate::handlers::time_off::update_time_off,
        crate::handlers::time_off::delete_time_off,
        crate::handlers::time_off::approve_time_off,
        crate::handlers::time_off::reject_time_off,
        crate::handlers::dashboard::dashboard_summary,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::RoleKind,
            crate::models::TimesheetStatus,
            crate::models::TimeOffStatus,
            crate::models::TimeOffKind,
            crate::error::ApiError,
            crate::handlers::HealthStatus,
            crate::handlers::DecisionRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::SignupRequest,
            crate::handlers::auth::TokenResponse,
            crate::handlers::employees::EmployeeView,
            crate::handlers::employees::CreateEmployeeRequest,
            crate::handlers::employees::UpdateEmployeeRequest,
            crate::handlers::clients::ClientView,
            crate::handlers::clients::CreateClientRequest,
            crate::handlers::clients::UpdateClientRequest,
            crate::handlers::dashboard::DashboardSummary,
            crate::intervals::EntryPayload,
            crate::intervals::BreakPayload,
            crate::intervals::DatedEntryPayload,
            crate::intervals::HoursSummary,
            crate::workflow::NewTimesheetRequest,
            crate::workflow::TimesheetPatch,
            crate::workflow::TimesheetView,
            crate::workflow::StoredEntry,
            crate::workflow::CreatedEntry,
            crate::workflow::TimesheetHours,
            crate::workflow::AuditEntryView,
            crate::workflow::NewTimeOffRequest,
            crate::workflow::TimeOffPatch,
            crate::workflow::TimeOffView,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "auth", description = "Login, signup and current user"),
        (name = "employees", description = "Employee accounts"),
        (name = "clients", description = "Client companies"),
        (name = "timesheets", description = "Weekly timesheets, entries and approvals"),
        (name = "time_off", description = "Leave requests and approvals"),
        (name = "dashboard", description = "Role-specific summaries"),
    ),
    info(
        title = "Timetracker API",
        description = "Weekly timesheets, leave requests and their approval workflows",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_workflow_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/timesheets/{id}/submit",
            "/api/v1/timesheets/{id}/approve",
            "/api/v1/timesheets/{id}/entries/{entry_id}",
            "/api/v1/time_off/{id}/reject",
            "/api/v1/dashboard/summary",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
