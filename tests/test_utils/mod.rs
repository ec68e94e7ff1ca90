//! Test utilities for driving the API in-process.
//!
//! Every test gets its own in-memory SQLite database with all migrations
//! applied and a router built from the same `create_app` the binary serves.

#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

use timetracker::config::AppConfig;
use timetracker::credentials::hash_password_with_iterations;
use timetracker::models::{RoleKind, client, employee};
use timetracker::notify::NotificationQueue;
use timetracker::repositories::{ClientRepository, EmployeeRepository, NewClient, NewEmployee};
use timetracker::server::{AppState, create_app};

pub const PASSWORD: &str = "correct-horse";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory file.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let db = setup_test_db().await?;
        let config = AppConfig {
            profile: "test".to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(config, db, NotificationQueue::disabled());
        let router = create_app(state.clone());
        Ok(Self { state, router })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn client(&self, name: &str, code: &str) -> Result<client::Model> {
        ClientRepository::new(self.db())
            .create(NewClient {
                name: name.to_string(),
                code: code.to_string(),
            })
            .await
            .context("inserting client fixture")
    }

    pub async fn employee(
        &self,
        full_name: &str,
        email: &str,
        role: RoleKind,
        client_id: Option<i32>,
    ) -> Result<employee::Model> {
        EmployeeRepository::new(self.db())
            .create(NewEmployee {
                full_name: full_name.to_string(),
                email: email.to_string(),
                password_hash: hash_password_with_iterations(PASSWORD, 1)?,
                role,
                client_id,
                is_active: true,
            })
            .await
            .context("inserting employee fixture")
    }

    pub fn token_for(&self, employee: &employee::Model) -> String {
        self.state
            .tokens
            .issue(employee.id)
            .expect("token issues for fixture employee")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), None).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

/// Two clients with a manager and a consultant each, plus an administrator.
pub struct Org {
    pub app: TestApp,
    pub acme: client::Model,
    pub globex: client::Model,
    pub admin: employee::Model,
    pub acme_manager: employee::Model,
    pub acme_consultant: employee::Model,
    pub globex_manager: employee::Model,
    pub globex_consultant: employee::Model,
}

impl Org {
    pub async fn new() -> Result<Self> {
        let app = TestApp::new().await?;
        let acme = app.client("Acme Corporation", "acme").await?;
        let globex = app.client("Globex", "globex").await?;
        let admin = app
            .employee("Dana Admin", "admin@dew.example", RoleKind::DewAdmin, None)
            .await?;
        let acme_manager = app
            .employee(
                "Morgan Lead",
                "manager@acme.example",
                RoleKind::ClientManager,
                Some(acme.id),
            )
            .await?;
        let acme_consultant = app
            .employee(
                "Casey Hours",
                "casey@acme.example",
                RoleKind::Consultant,
                Some(acme.id),
            )
            .await?;
        let globex_manager = app
            .employee(
                "Riley Boss",
                "manager@globex.example",
                RoleKind::ClientManager,
                Some(globex.id),
            )
            .await?;
        let globex_consultant = app
            .employee(
                "Jordan Field",
                "jordan@globex.example",
                RoleKind::Consultant,
                Some(globex.id),
            )
            .await?;

        Ok(Self {
            app,
            acme,
            globex,
            admin,
            acme_manager,
            acme_consultant,
            globex_manager,
            globex_consultant,
        })
    }

    pub fn token(&self, employee: &employee::Model) -> String {
        self.app.token_for(employee)
    }
}
