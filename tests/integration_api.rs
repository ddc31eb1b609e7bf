//! HTTP API tests
//!
//! Drive the full router (middleware included) over the in-memory ledger.

mod common;

use account_ledger::api::build_app;
use account_ledger::lock::LockSettings;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::TimeZone;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::TestLedger;

fn fixture() -> (TestLedger, Router, Uuid) {
    let fixture = TestLedger::new(LockSettings::default());
    let account_id = fixture.open_account();
    let app = build_app(fixture.app_state());
    (fixture, app, account_id)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post_json(uri: &str, business_id: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-business-id", business_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, business_id: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-business-id", business_id.to_string())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (_, app, _) = fixture();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_create_and_fetch_movement() {
    let (fx, app, account_id) = fixture();

    let (status, created) = send(
        &app,
        post_json(
            &format!("/accounts/{}/movements", account_id),
            fx.business_id,
            json!({"movement_type": "CREDIT", "amount": "150.25", "description": "deposit"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["movement_type"], "CREDIT");
    assert_eq!(created["amount"], "150.25");
    assert_eq!(created["description"], "deposit");

    let movement_id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/movements/{}", movement_id), fx.business_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, _) = send(&app, get(&format!("/movements/{}", movement_id), Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_balance_and_paginated_listing() {
    let (fx, app, account_id) = fixture();
    fx.fund(account_id, 500);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/accounts/{}/movements", account_id),
            fx.business_id,
            json!({"movement_type": "DEBIT", "amount": 120}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, balance) = send(&app, get(&format!("/accounts/{}/balance", account_id), fx.business_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], "380");

    let (status, page) = send(
        &app,
        get(&format!("/accounts/{}/movements?page=1&per_page=1", account_id), fx.business_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["movement_type"], "DEBIT");
}

#[tokio::test]
async fn test_rejected_debit_is_unprocessable() {
    let (fx, app, account_id) = fixture();
    fx.fund(account_id, 100);

    let (status, body) = send(
        &app,
        post_json(
            &format!("/accounts/{}/movements", account_id),
            fx.business_id,
            json!({"movement_type": "DEBIT", "amount": "19"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "invalid_operation");
}

#[tokio::test]
async fn test_validate_withdrawal_endpoint() {
    let (fx, app, account_id) = fixture();
    fx.fund(account_id, 100);
    let uri = format!("/accounts/{}/withdrawals/validate", account_id);

    let (status, body) = send(&app, post_json(&uri, fx.business_id, json!({"amount": "50"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["available_balance"], "100");

    let (status, body) = send(&app, post_json(&uri, fx.business_id, json!({"amount": "150"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["reason"], "insufficient balance");
}

#[tokio::test]
async fn test_missing_or_bad_tenant_header() {
    let (_, app, account_id) = fixture();

    let request = Request::builder()
        .uri(format!("/accounts/{}/balance", account_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");

    let request = Request::builder()
        .uri(format!("/accounts/{}/balance", account_id))
        .header("x-business-id", "acme")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let (fx, app, _) = fixture();

    let (status, body) = send(&app, get(&format!("/accounts/{}/balance", Uuid::new_v4()), fx.business_id)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "resource_not_found");
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_admin_snapshot_run() {
    let (fx, app, account_id) = fixture();
    fx.fund(account_id, 250);
    fx.clock.set(chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 10, 0).unwrap());

    let (status, report) = send(&app, post_empty("/admin/snapshots")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((report["month"].as_u64(), report["year"].as_i64()), (Some(2), Some(2026)));
    assert_eq!(report["snapshots"][0]["balance"], "250");

    let (_, report) = send(&app, post_empty("/admin/snapshots")).await;
    assert_eq!(report["skipped"], 1);
    assert_eq!(fx.ledger.snapshots(account_id).len(), 1);
}
