//! Integration tests for login, signup and bearer token handling.

use axum::http::{Method, StatusCode};
use serde_json::json;
use timetracker::models::RoleKind;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{Org, PASSWORD, TestApp};

#[tokio::test]
async fn login_returns_a_token_that_resolves_to_the_employee() {
    let org = Org::new().await.unwrap();

    let (status, body) = org
        .app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": " Casey@ACME.example", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], "casey@acme.example");
    assert_eq!(body["user"]["role"], "consultant");

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = org.app.get("/api/v1/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], json!(org.acme_consultant.id));
    assert_eq!(me["client_id"], json!(org.acme.id));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let org = Org::new().await.unwrap();

    for credentials in [
        json!({ "email": "casey@acme.example", "password": "wrong-password" }),
        json!({ "email": "nobody@acme.example", "password": PASSWORD }),
    ] {
        let (status, body) = org
            .app
            .request(Method::POST, "/api/v1/auth/login", None, Some(credentials))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Incorrect email or password");
    }
}

#[tokio::test]
async fn disabled_accounts_cannot_log_in_or_use_tokens() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let (status, _) = org
        .app
        .put(
            &format!("/api/v1/employees/{}", org.acme_consultant.id),
            &org.token(&org.admin),
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = org
        .app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "casey@acme.example", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is disabled");

    let (status, _) = org.app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app
        .request(Method::GET, "/api/v1/timesheets", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/v1/timesheets", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_validates_role_and_client() {
    let org = Org::new().await.unwrap();
    let signup = |body| {
        org.app
            .request(Method::POST, "/api/v1/auth/signup", None, Some(body))
    };

    let (status, body) = signup(json!({
        "email": "new@acme.example",
        "password": "long-enough",
        "full_name": "New Hire",
        "role": "consultant",
        "client_id": org.acme.id
    }))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "consultant");
    assert!(body["access_token"].as_str().is_some());

    let (status, body) = signup(json!({
        "email": "NEW@acme.example",
        "password": "long-enough",
        "full_name": "Duplicate",
        "role": "consultant",
        "client_id": org.acme.id
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = signup(json!({
        "email": "floating@acme.example",
        "password": "long-enough",
        "full_name": "No Client",
        "role": "consultant"
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = signup(json!({
        "email": "ghost@acme.example",
        "password": "long-enough",
        "full_name": "Ghost Client",
        "role": "client_manager",
        "client_id": 9999
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid client ID");

    let (status, _) = signup(json!({
        "email": "short@acme.example",
        "password": "abc",
        "full_name": "Short Password",
        "role": "consultant",
        "client_id": org.acme.id
    }))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn administrator_signup_only_bootstraps_the_first_admin() {
    let app = TestApp::new().await.unwrap();
    let admin = json!({
        "email": "root@dew.example",
        "password": "long-enough",
        "full_name": "First Admin",
        "role": "dew_admin"
    });

    let (status, _) = app
        .request(Method::POST, "/api/v1/auth/signup", None, Some(admin))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "second@dew.example",
                "password": "long-enough",
                "full_name": "Second Admin",
                "role": "dew_admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let client = app.client("Acme", "acme").await.unwrap();
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "admin-with-client@dew.example",
                "password": "long-enough",
                "full_name": "Wrong Shape",
                "role": "dew_admin",
                "client_id": client.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fixture_roles_round_trip_through_me() {
    let org = Org::new().await.unwrap();

    for (employee, role) in [
        (&org.admin, RoleKind::DewAdmin),
        (&org.acme_manager, RoleKind::ClientManager),
        (&org.globex_consultant, RoleKind::Consultant),
    ] {
        let (status, me) = org.app.get("/api/v1/auth/me", &org.token(employee)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["role"], role.as_str());
    }
}
