//! Integration tests for leave requests and their approval.

use axum::http::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::Org;

fn vacation() -> Value {
    json!({
        "start_date": "2025-02-03",
        "end_date": "2025-02-07",
        "type": "vacation",
        "manager_email": "MANAGER@acme.example",
        "comment": "Family trip"
    })
}

async fn pending_request(org: &Org) -> (i64, String) {
    let token = org.token(&org.acme_consultant);
    let (status, body) = org.app.post("/api/v1/time_off", &token, vacation()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["id"].as_i64().unwrap(), token)
}

#[tokio::test]
async fn consultant_files_a_pending_request() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let (status, body) = org.app.post("/api/v1/time_off", &token, vacation()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["type"], "vacation");
    assert_eq!(body["manager_email"], "manager@acme.example");
    assert_eq!(body["employee_id"], json!(org.acme_consultant.id));
}

#[tokio::test]
async fn only_consultants_request_time_off() {
    let org = Org::new().await.unwrap();

    for token in [org.token(&org.acme_manager), org.token(&org.admin)] {
        let (status, _) = org.app.post("/api/v1/time_off", &token, vacation()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn end_date_must_not_precede_start_date() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let mut body = vacation();
    body["end_date"] = json!("2025-02-01");
    let (status, error) = org.app.post("/api/v1/time_off", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"]["field"], "end_date");

    let mut single_day = vacation();
    single_day["end_date"] = json!("2025-02-03");
    let (status, _) = org.app.post("/api/v1/time_off", &token, single_day).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_leave_type_is_rejected() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let mut body = vacation();
    body["type"] = json!("sabbatical");
    let (status, error) = org.app.post("/api/v1/time_off", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn approving_twice_fails() {
    let org = Org::new().await.unwrap();
    let (id, _) = pending_request(&org).await;
    let manager = org.token(&org.acme_manager);
    let uri = format!("/api/v1/time_off/{id}/approve");

    let (status, body) = org.app.post_empty(&uri, &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["approved_by"], json!(org.acme_manager.id));
    assert!(body["approved_at"].is_string());

    let (status, body) = org.app.post_empty(&uri, &manager).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only pending requests can be approved");
}

#[tokio::test]
async fn decisions_belong_to_the_addressed_manager() {
    let org = Org::new().await.unwrap();
    let (id, owner) = pending_request(&org).await;
    let uri = format!("/api/v1/time_off/{id}/reject");

    for token in [org.token(&org.globex_manager), org.token(&org.admin), owner] {
        let (status, _) = org.app.post_empty(&uri, &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, body) = org
        .app
        .post(
            &uri,
            &org.token(&org.acme_manager),
            json!({ "comment": "Release week" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["manager_comment"], "Release week");
}

#[tokio::test]
async fn owner_edits_and_withdraws_while_pending() {
    let org = Org::new().await.unwrap();
    let (id, owner) = pending_request(&org).await;
    let uri = format!("/api/v1/time_off/{id}");

    let (status, _) = org
        .app
        .put(&uri, &org.token(&org.acme_manager), json!({ "comment": "x" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = org
        .app
        .put(&uri, &owner, json!({ "type": "sick", "end_date": "2025-02-04" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "sick");
    assert_eq!(body["end_date"], "2025-02-04");

    let (status, _) = org
        .app
        .put(&uri, &owner, json!({ "end_date": "2025-01-31" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = org.app.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = org.app.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn decided_requests_are_frozen() {
    let org = Org::new().await.unwrap();
    let (id, owner) = pending_request(&org).await;
    let uri = format!("/api/v1/time_off/{id}");

    org.app
        .post_empty(&format!("{uri}/approve"), &org.token(&org.acme_manager))
        .await;

    let (status, body) = org
        .app
        .put(&uri, &owner, json!({ "comment": "changed plans" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only pending requests can be updated");

    let (status, _) = org.app.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let org = Org::new().await.unwrap();
    pending_request(&org).await;
    let globex = org.token(&org.globex_consultant);
    let (status, _) = org
        .app
        .post(
            "/api/v1/time_off",
            &globex,
            json!({
                "start_date": "2025-03-03",
                "end_date": "2025-03-03",
                "type": "other",
                "manager_email": "manager@globex.example"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let count = |body: &Value| body.as_array().map(Vec::len).unwrap_or_default();

    let (_, admin_view) = org.app.get("/api/v1/time_off", &org.token(&org.admin)).await;
    assert_eq!(count(&admin_view), 2);

    let (_, manager_view) = org
        .app
        .get("/api/v1/time_off", &org.token(&org.acme_manager))
        .await;
    assert_eq!(count(&manager_view), 1);
    assert_eq!(manager_view[0]["employee_id"], json!(org.acme_consultant.id));

    let (_, own_view) = org.app.get("/api/v1/time_off", &globex).await;
    assert_eq!(count(&own_view), 1);
    assert_eq!(own_view[0]["type"], "other");
}

#[tokio::test]
async fn concurrent_approve_and_reject_settle_on_one_decision() {
    let org = Org::new().await.unwrap();
    let (id, owner) = pending_request(&org).await;
    let manager = org.token(&org.acme_manager);
    let approve = format!("/api/v1/time_off/{id}/approve");
    let reject = format!("/api/v1/time_off/{id}/reject");

    let ((approved, approve_body), (rejected, reject_body)) = tokio::join!(
        org.app.post_empty(&approve, &manager),
        org.app.post_empty(&reject, &manager),
    );

    let (winner, loser_body) = match (approved, rejected) {
        (StatusCode::OK, StatusCode::BAD_REQUEST) => ("approved", reject_body),
        (StatusCode::BAD_REQUEST, StatusCode::OK) => ("rejected", approve_body),
        other => panic!("expected exactly one decision to succeed, got {other:?}"),
    };
    assert!(
        loser_body["message"]
            .as_str()
            .unwrap()
            .starts_with("Only pending requests can be"),
        "{loser_body}"
    );

    let (_, request) = org.app.get(&format!("/api/v1/time_off/{id}"), &owner).await;
    assert_eq!(request["status"], winner);
}

#[tokio::test]
async fn withdrawal_racing_a_decision_leaves_one_outcome() {
    let org = Org::new().await.unwrap();
    let (id, owner) = pending_request(&org).await;
    let uri = format!("/api/v1/time_off/{id}");
    let manager = org.token(&org.acme_manager);

    let approve_uri = format!("{uri}/approve");
    let ((deleted, _), (approved, _)) = tokio::join!(
        org.app.delete(&uri, &owner),
        org.app.post_empty(&approve_uri, &manager),
    );

    let (status, request) = org.app.get(&uri, &owner).await;
    match (deleted, approved) {
        (StatusCode::NO_CONTENT, StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) => {
            assert_eq!(status, StatusCode::NOT_FOUND)
        }
        (StatusCode::BAD_REQUEST, StatusCode::OK) => assert_eq!(request["status"], "approved"),
        other => panic!("unexpected outcome {other:?}"),
    }
}
