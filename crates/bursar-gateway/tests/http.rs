use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bursar_gateway::{STAFF_HEADER, router};
use bursar_store::InMemoryStore;
use bursar_workflow::BursarService;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    router(BursarService::new(Arc::new(InMemoryStore::new())))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    staff: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(staff) = staff {
        request = request.header(STAFF_HEADER, staff);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .expect("request"),
        None => request.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("route executes");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seed_application(app: &Router) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/applications",
        Some("7"),
        Some(json!({
            "basicInformation_firstname": "Kojo",
            "last_name": "Annan",
            "mat_number": "UENR-31",
            "email": "kojo@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().expect("id")
}

async fn seed_university(app: &Router) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/universities",
        Some("7"),
        Some(json!({ "name": "UENR", "app_fee_flat": "100.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().expect("id")
}

#[tokio::test]
async fn healthz_responds_ok() {
    let response = app()
        .oneshot(
            Request::get("/healthz")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutations_require_staff_header() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/applications",
        None,
        Some(json!({ "first_name": "Kojo", "last_name": "Annan", "mat_number": "U-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "unauthorized");

    let (status, _) = send(
        &app,
        "POST",
        "/applications",
        Some("not-a-number"),
        Some(json!({ "first_name": "Kojo", "last_name": "Annan", "mat_number": "U-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_application_reads_back_with_external_names() {
    let app = app();
    let id = seed_application(&app).await;

    let (status, body) = send(&app, "GET", &format!("/applications/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Kojo");
    assert_eq!(body["status"], "open");
    assert!(body["tuition_amount"].is_null());
    assert!(
        body["reference_code"]
            .as_str()
            .is_some_and(|code| code.starts_with("BUR-"))
    );
}

#[tokio::test]
async fn resolution_errors_map_to_status_codes() {
    let app = app();
    let university_id = seed_university(&app).await;
    let id = seed_application(&app).await;
    let uri = format!("/applications/{id}/resolve");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some("7"),
        Some(json!({
            "approve": true,
            "university_id": university_id,
            "start_date": "2025-01-01",
            "arrears_amount": "0.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "missing_field");
    assert_eq!(body["error"]["field"], "tuition_amount");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some("7"),
        Some(json!({ "approve": false, "tuition_amount": "5000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_state");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some("7"),
        Some(json!({
            "approve": true,
            "university": university_id,
            "start_date": "2025-01-01",
            "tuition_amount": "5000.00",
            "arrears_amount": "0.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "approved");
    assert_eq!(body["tuition_amount"], "5000.00");
    assert_eq!(body["arrears_amount"], "0.00");
    assert_eq!(body["start_date"], "2025-01-01");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some("7"),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let app = app();

    let (status, body) = send(&app, "GET", "/applications/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");

    let (status, _) = send(&app, "GET", "/invoices/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_enum_in_query_is_unprocessable() {
    let app = app();
    let (status, body) = send(&app, "GET", "/applications?status=archived", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_enum");
    assert_eq!(body["error"]["field"], "status");
}

#[tokio::test]
async fn ledger_flow_updates_finances() {
    let app = app();
    let university_id = seed_university(&app).await;
    let id = seed_application(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/applications/{id}/resolve"),
        Some("7"),
        Some(json!({
            "approve": true,
            "university_id": university_id,
            "start_date": "2025-01-01",
            "tuition_amount": "4000",
            "arrears_amount": "0",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/invoices",
        Some("7"),
        Some(json!({
            "student_id": id,
            "memo": "books advance",
            "amount": "250.00",
            "type": "advance",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["student_name"], "Kojo Annan");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/applications/{id}/deposits"),
        Some("7"),
        Some(json!([
            { "date": "2025-02-01", "memo": "momo", "amount": "50" },
            { "date": "2025-02-15", "memo": "bank", "amount": "25.5" },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], 2);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/applications/{id}/finances"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_fee"], "100.00");
    assert_eq!(body["total_advances"], "250.00");
    assert_eq!(body["total_deposited"], "75.50");
    assert_eq!(body["total_remaining"], "274.50");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/deposits?student_id={id}&limit=1"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn search_requires_a_query() {
    let app = app();
    seed_application(&app).await;

    let (status, body) = send(&app, "GET", "/applications/search", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["field"], "q");

    let (status, body) = send(&app, "GET", "/applications/search?q=annan", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn malformed_json_is_reported_as_invalid_value() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::post("/universities")
                .header(STAFF_HEADER, "7")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ not json"))
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert!(response.status().is_client_error());
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 16)
        .await
        .expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("json error body");
    assert_eq!(body["error"]["kind"], "invalid_value");
    assert_eq!(body["error"]["field"], "body");
}

#[tokio::test]
async fn deposit_put_replaces_fields_and_refuses_voided_rows() {
    let app = app();
    let id = seed_application(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/deposits",
        Some("7"),
        Some(json!({ "student_id": id, "date": "2025-02-01", "memo": "momo", "amount": "50" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let deposit_id = body["id"].as_i64().expect("id");
    let uri = format!("/deposits/{deposit_id}");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        None,
        Some(json!({ "date": "2025-02-01", "memo": "momo", "amount": "60" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some("7"),
        Some(json!({ "date": "2025-02-01", "memo": "momo" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "missing_field");
    assert_eq!(body["error"]["field"], "amount");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some("7"),
        Some(json!({
            "date": "2025-02-03",
            "memo": "momo, reversed",
            "amount": "60",
            "complete": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["amount"], "60.00");
    assert_eq!(body["complete"], false);
    assert_eq!(body["date"], "2025-02-03");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/applications/{id}/finances"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_deposited"], "0.00");
    assert_eq!(body["total_pending_deposits"], "60.00");

    let (status, _) = send(&app, "POST", &format!("{uri}/void"), Some("7"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some("7"),
        Some(json!({ "date": "2025-02-03", "memo": "late fix", "amount": "61" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_state");
    assert_eq!(body["error"]["field"], "voided_at");

    let (status, body) = send(
        &app,
        "PUT",
        "/deposits/404",
        Some("7"),
        Some(json!({ "date": "2025-02-03", "memo": "ghost", "amount": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn comment_put_edits_message() {
    let app = app();
    let id = seed_application(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/applications/{id}/comments"),
        Some("7"),
        Some(json!({ "message": "left voicemail" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let comment_id = body["id"].as_i64().expect("id");
    let uri = format!("/comments/{comment_id}");

    let (status, body) = send(&app, "PUT", &uri, Some("7"), Some(json!({ "message": " " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "missing_field");
    assert_eq!(body["error"]["field"], "message");

    let (status, body) = send(
        &app,
        "PUT",
        "/comments/404",
        Some("7"),
        Some(json!({ "message": "nobody home" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["field"], "comment");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some("7"),
        Some(json!({ "message": "spoke to guardian" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "spoke to guardian");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/applications/{id}/comments"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["message"], "spoke to guardian");
}
