//! Integration tests for the timesheet lifecycle: creation with entries,
//! submission, manager decisions and entry edits.

use axum::http::StatusCode;
use serde_json::{Value, json};
use timetracker::models::RoleKind;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::Org;

const WEEK: &str = "2025-01-06";

fn single_day_sheet(entries: Value) -> Value {
    json!({
        "week_start": WEEK,
        "manager_email": "Manager@Acme.example ",
        "project": "billing",
        "entries": { "2025-01-06": entries },
    })
}

async fn create_sheet(org: &Org, token: &str, body: Value) -> Value {
    let (status, sheet) = org.app.post("/api/v1/timesheets", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {sheet}");
    sheet
}

async fn submitted_sheet(org: &Org) -> (i64, String) {
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        org,
        &consultant,
        single_day_sheet(json!([{ "in_time": "09:00", "out_time": "17:00" }])),
    )
    .await;
    let id = sheet["id"].as_i64().unwrap();
    let (status, _) = org
        .app
        .post_empty(&format!("/api/v1/timesheets/{id}/submit"), &consultant)
        .await;
    assert_eq!(status, StatusCode::OK);
    (id, consultant)
}

#[tokio::test]
async fn create_stores_entries_and_reports_hours() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let sheet = create_sheet(
        &org,
        &token,
        single_day_sheet(json!([{
            "in_time": "09:00",
            "out_time": "18:00",
            "breaks": [{ "start": "12:00", "end": "12:30" }],
            "note": "sprint planning"
        }])),
    )
    .await;

    assert_eq!(sheet["status"], "draft");
    assert_eq!(sheet["employee_id"], json!(org.acme_consultant.id));
    assert_eq!(sheet["manager_email"], "manager@acme.example");
    assert_eq!(sheet["hours"]["total"], json!(8.5));
    assert_eq!(sheet["hours"]["regular"], json!(8.0));
    assert_eq!(sheet["hours"]["overtime"], json!(0.5));

    let day = &sheet["entries"]["2025-01-06"];
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["in_time"], "09:00");
    assert_eq!(day[0]["breaks"][0]["end"], "12:30");
    assert_eq!(day[0]["note"], "sprint planning");
}

#[tokio::test]
async fn overtime_is_split_per_entry_not_per_day() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let sheet = create_sheet(
        &org,
        &token,
        single_day_sheet(json!([
            { "in_time": "08:00", "out_time": "13:00" },
            { "in_time": "13:00", "out_time": "18:00" }
        ])),
    )
    .await;

    // Two five hour entries make a ten hour day without any overtime
    assert_eq!(sheet["hours"]["total"], json!(10.0));
    assert_eq!(sheet["hours"]["overtime"], json!(0.0));
}

#[tokio::test]
async fn create_rejects_overlapping_initial_entries_atomically() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let (status, body) = org
        .app
        .post(
            "/api/v1/timesheets",
            &token,
            single_day_sheet(json!([
                { "in_time": "09:00", "out_time": "12:00" },
                { "in_time": "11:00", "out_time": "13:00" }
            ])),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["reason"], "overlaps_existing_entry");
    assert_eq!(body["details"]["date"], "2025-01-06");
    assert_eq!(body["details"]["entry_index"], json!(1));

    let (_, list) = org.app.get("/api/v1/timesheets", &token).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn create_requires_monday_and_dates_inside_the_week() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_consultant);

    let (status, body) = org
        .app
        .post(
            "/api/v1/timesheets",
            &token,
            json!({ "week_start": "2025-01-07", "manager_email": "manager@acme.example" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "week_start");

    let (status, _) = org
        .app
        .post(
            "/api/v1/timesheets",
            &token,
            json!({
                "week_start": WEEK,
                "manager_email": "manager@acme.example",
                "entries": { "2025-01-13": [{ "in_time": "09:00", "out_time": "10:00" }] }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn managers_cannot_own_timesheets() {
    let org = Org::new().await.unwrap();
    let token = org.token(&org.acme_manager);

    let (status, body) = org
        .app
        .post(
            "/api/v1/timesheets",
            &token,
            json!({ "week_start": WEEK, "manager_email": "manager@acme.example" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn submit_succeeds_once_from_draft() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;

    let (status, sheet) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}"), &consultant)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["status"], "submitted");
    assert!(sheet["submitted_at"].is_string());

    let (status, body) = org
        .app
        .post_empty(&format!("/api/v1/timesheets/{id}/submit"), &consultant)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only draft timesheets can be submitted");
}

#[tokio::test]
async fn only_the_owner_submits() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        json!({ "week_start": WEEK, "manager_email": "manager@acme.example" }),
    )
    .await;
    let id = sheet["id"].as_i64().unwrap();

    for token in [org.token(&org.acme_manager), org.token(&org.admin)] {
        let (status, _) = org
            .app
            .post_empty(&format!("/api/v1/timesheets/{id}/submit"), &token)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn approval_requires_the_addressed_manager_of_the_same_client() {
    let org = Org::new().await.unwrap();
    let (id, _) = submitted_sheet(&org).await;
    let uri = format!("/api/v1/timesheets/{id}/approve");

    let other_manager = org
        .app
        .employee(
            "Sam Second",
            "second@acme.example",
            RoleKind::ClientManager,
            Some(org.acme.id),
        )
        .await
        .unwrap();

    for token in [
        org.token(&other_manager),
        org.token(&org.globex_manager),
        org.token(&org.admin),
        org.token(&org.acme_consultant),
    ] {
        let (status, _) = org.app.post_empty(&uri, &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let manager = org.token(&org.acme_manager);
    let (status, sheet) = org
        .app
        .post(&uri, &manager, json!({ "comment": "Looks right" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["status"], "approved");
    assert_eq!(sheet["approved_by"], json!(org.acme_manager.id));
    assert_eq!(sheet["manager_comment"], "Looks right");

    let (status, body) = org.app.post_empty(&uri, &manager).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn draft_timesheets_cannot_be_decided() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        json!({ "week_start": WEEK, "manager_email": "manager@acme.example" }),
    )
    .await;
    let id = sheet["id"].as_i64().unwrap();

    let (status, body) = org
        .app
        .post_empty(
            &format!("/api/v1/timesheets/{id}/reject"),
            &org.token(&org.acme_manager),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only submitted timesheets can be rejected");
}

#[tokio::test]
async fn reject_records_the_manager_comment() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;

    let (status, sheet) = org
        .app
        .post(
            &format!("/api/v1/timesheets/{id}/reject"),
            &org.token(&org.acme_manager),
            json!({ "comment": "Friday is missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["status"], "rejected");
    assert_eq!(sheet["manager_comment"], "Friday is missing");

    let (status, _) = org
        .app
        .post_empty(&format!("/api/v1/timesheets/{id}/submit"), &consultant)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decision_body_must_be_json_when_present() {
    let org = Org::new().await.unwrap();
    let (id, _) = submitted_sheet(&org).await;

    let (status, body) = org
        .app
        .post(
            &format!("/api/v1/timesheets/{id}/approve"),
            &org.token(&org.acme_manager),
            json!({ "comment": "ok", "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn entries_can_be_added_and_removed_until_a_decision() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;
    let entries = format!("/api/v1/timesheets/{id}/entries");

    let (status, created) = org
        .app
        .post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-07", "in_time": "09:00", "out_time": "12:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["day_total_hours"], json!(3.0));
    let entry_id = created["entry"]["id"].as_i64().unwrap();

    let (_, hours) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}/hours"), &consultant)
        .await;
    assert_eq!(hours["summary"]["total"], json!(11.0));
    assert_eq!(hours["days"]["2025-01-07"]["total"], json!(3.0));

    let (status, _) = org
        .app
        .delete(&format!("{entries}/{entry_id}"), &consultant)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = org
        .app
        .delete(&format!("{entries}/{entry_id}"), &consultant)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = org
        .app
        .post_empty(
            &format!("/api/v1/timesheets/{id}/approve"),
            &org.token(&org.acme_manager),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = org
        .app
        .post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-08", "in_time": "09:00", "out_time": "12:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn added_entry_is_checked_against_the_whole_day() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        single_day_sheet(json!([{ "in_time": "09:00", "out_time": "12:00" }])),
    )
    .await;
    let entries = format!("/api/v1/timesheets/{}/entries", sheet["id"]);

    let (status, body) = org
        .app
        .post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-06", "in_time": "11:30", "out_time": "14:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["reason"], "overlaps_existing_entry");
    assert_eq!(body["details"]["conflict"]["in_time"], "09:00");
    assert_eq!(body["details"]["conflict"]["out_time"], "12:00");

    let (status, _) = org
        .app
        .post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-06", "in_time": "12:00", "out_time": "14:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = org
        .app
        .post(
            &entries,
            &consultant,
            json!({
                "date": "2025-01-06",
                "in_time": "15:00",
                "out_time": "18:00",
                "breaks": [
                    { "start": "16:00", "end": "16:30" },
                    { "start": "16:15", "end": "16:45" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["reason"], "overlapping_breaks");
}

#[tokio::test]
async fn patch_updates_fields_and_routes_status_through_the_workflow() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        json!({ "week_start": WEEK, "manager_email": "manager@acme.example" }),
    )
    .await;
    let uri = format!("/api/v1/timesheets/{}", sheet["id"]);

    let (status, _) = org
        .app
        .put(&uri, &consultant, json!({ "notes": "unknown field" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = org.app.put(&uri, &consultant, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = org
        .app
        .put(&uri, &consultant, json!({ "status": "draft" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Approval through the patch still needs the addressed manager
    let (status, _) = org
        .app
        .put(&uri, &consultant, json!({ "status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = org
        .app
        .put(
            &uri,
            &consultant,
            json!({ "comment": "ready", "status": "submitted" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["comment"], "ready");
    assert_eq!(updated["status"], "submitted");

    let (_, trail) = org.app.get(&format!("{uri}/audit"), &consultant).await;
    let events: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        events,
        ["timesheet_created", "timesheet_updated", "timesheet_submitted"]
    );
}

#[tokio::test]
async fn audit_trail_records_the_deciding_manager() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;

    org.app
        .post(
            &format!("/api/v1/timesheets/{id}/reject"),
            &org.token(&org.acme_manager),
            json!({ "comment": "split per project" }),
        )
        .await;

    let (status, trail) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}/audit"), &consultant)
        .await;
    assert_eq!(status, StatusCode::OK);
    let last = trail.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["event"], "timesheet_rejected");
    assert_eq!(last["actor_email"], "manager@acme.example");
    assert_eq!(last["actor_role"], "client_manager");
    assert_eq!(last["details"]["from"], "submitted");
    assert_eq!(last["details"]["to"], "rejected");
    assert_eq!(last["details"]["comment"], "split per project");
}

#[tokio::test]
async fn decided_timesheets_cannot_be_deleted() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;
    let uri = format!("/api/v1/timesheets/{id}");

    org.app
        .post_empty(&format!("{uri}/approve"), &org.token(&org.acme_manager))
        .await;

    let (status, _) = org.app.delete(&uri, &consultant).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let draft = create_sheet(
        &org,
        &consultant,
        json!({ "week_start": "2025-01-13", "manager_email": "manager@acme.example" }),
    )
    .await;
    let (status, _) = org
        .app
        .delete(&format!("/api/v1/timesheets/{}", draft["id"]), &consultant)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn concurrent_submits_let_exactly_one_through() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        single_day_sheet(json!([{ "in_time": "09:00", "out_time": "17:00" }])),
    )
    .await;
    let uri = format!("/api/v1/timesheets/{}/submit", sheet["id"]);

    let ((first, _), (second, _)) = tokio::join!(
        org.app.post_empty(&uri, &consultant),
        org.app.post_empty(&uri, &consultant),
    );

    let mut statuses = [first, second];
    statuses.sort_by_key(|status| status.as_u16());
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
}

#[tokio::test]
async fn concurrent_approve_and_reject_record_a_single_decision() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;
    let manager = org.token(&org.acme_manager);
    let approve = format!("/api/v1/timesheets/{id}/approve");
    let reject = format!("/api/v1/timesheets/{id}/reject");

    let ((approved, _), (rejected, _)) = tokio::join!(
        org.app.post_empty(&approve, &manager),
        org.app.post_empty(&reject, &manager),
    );

    let winner = match (approved, rejected) {
        (StatusCode::OK, StatusCode::BAD_REQUEST) => "approved",
        (StatusCode::BAD_REQUEST, StatusCode::OK) => "rejected",
        other => panic!("expected exactly one decision to succeed, got {other:?}"),
    };

    let (_, sheet) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}"), &consultant)
        .await;
    assert_eq!(sheet["status"], winner);

    let (_, trail) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}/audit"), &consultant)
        .await;
    let decisions: Vec<&Value> = trail
        .as_array()
        .unwrap()
        .iter()
        .filter(|event| {
            matches!(
                event["event"].as_str(),
                Some("timesheet_approved" | "timesheet_rejected")
            )
        })
        .collect();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["details"]["to"], winner);
}

#[tokio::test]
async fn concurrent_overlapping_entries_keep_the_day_consistent() {
    let org = Org::new().await.unwrap();
    let consultant = org.token(&org.acme_consultant);
    let sheet = create_sheet(
        &org,
        &consultant,
        json!({ "week_start": WEEK, "manager_email": "manager@acme.example" }),
    )
    .await;
    let id = sheet["id"].as_i64().unwrap();
    let entries = format!("/api/v1/timesheets/{id}/entries");

    let ((morning, _), (late_morning, _)) = tokio::join!(
        org.app.post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-07", "in_time": "09:00", "out_time": "12:00" }),
        ),
        org.app.post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-07", "in_time": "10:00", "out_time": "13:00" }),
        ),
    );

    let mut statuses = [morning, late_morning];
    statuses.sort_by_key(|status| status.as_u16());
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let (_, hours) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}/hours"), &consultant)
        .await;
    assert_eq!(hours["days"]["2025-01-07"]["total"], json!(3.0));
}

#[tokio::test]
async fn entry_racing_an_approval_never_lands_on_a_decided_sheet() {
    let org = Org::new().await.unwrap();
    let (id, consultant) = submitted_sheet(&org).await;
    let manager = org.token(&org.acme_manager);
    let entries = format!("/api/v1/timesheets/{id}/entries");

    let approve_uri = format!("/api/v1/timesheets/{id}/approve");
    let ((added, _), (approved, _)) = tokio::join!(
        org.app.post(
            &entries,
            &consultant,
            json!({ "date": "2025-01-07", "in_time": "09:00", "out_time": "12:00" }),
        ),
        org.app.post_empty(&approve_uri, &manager),
    );
    assert_eq!(approved, StatusCode::OK);
    assert!(matches!(added, StatusCode::CREATED | StatusCode::BAD_REQUEST));

    let (_, hours) = org
        .app
        .get(&format!("/api/v1/timesheets/{id}/hours"), &consultant)
        .await;
    let expected = if added == StatusCode::CREATED { 11.0 } else { 8.0 };
    assert_eq!(hours["summary"]["total"], json!(expected));
}
