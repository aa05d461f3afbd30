use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

fn purchase_body(license_type: &str, email: &str) -> serde_json::Value {
    json!({
        "licenseType": license_type,
        "customerEmail": email,
        "customerName": "Ann Buyer",
    })
}

#[tokio::test]
async fn test_health() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_catalog_is_public_and_grouped() {
    let (_dir, state) = test_state();
    {
        let mut conn = state.db.get().unwrap();
        add_licenses(&mut conn, "Pro-2", &["A-1", "A-2"], "100.00");
        add_licenses(&mut conn, "Pro-3", &["B-1"], "150.00");
    }
    let app = keyshop::app(state);

    let (status, body) = send(&app, "GET", "/api/licenses/available", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["type"], "Pro-2");
    assert_eq!(groups[0]["price"], "100.00");
    assert_eq!(groups[0]["count"], 2);
    assert_eq!(groups[1]["type"], "Pro-3");
    assert_eq!(groups[1]["count"], 1);
}

#[tokio::test]
async fn test_purchase_until_out_of_stock() {
    let (_dir, state) = test_state();
    {
        let mut conn = state.db.get().unwrap();
        add_licenses(&mut conn, "Pro-2", &["A-1"], "100.00");
    }
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(purchase_body("Pro-2", "Ann@Example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sale"]["amount"], "100.00");
    assert_eq!(body["sale"]["status"], "active");
    assert_eq!(body["license"]["type"], "Pro-2");
    assert_eq!(body["license"]["isSold"], true);
    assert_eq!(body["customer"]["email"], "ann@example.com");

    let (_, catalog) = send(&app, "GET", "/api/licenses/available", None, None).await;
    assert!(catalog.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(purchase_body("Pro-2", "ann@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OUT_OF_STOCK");
}

#[tokio::test]
async fn test_purchase_validation_errors_name_the_field() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(purchase_body("Pro-2", "nope")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "customerEmail");

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(purchase_body("  ", "a@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "licenseType");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(json!({ "licenseType": "Pro-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(&app, "POST", "/api/sales", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_reports_each_unit() {
    let (_dir, state) = test_state();
    {
        let mut conn = state.db.get().unwrap();
        add_licenses(&mut conn, "Pro-2", &["A-1", "A-2"], "100.00");
    }
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        None,
        Some(json!({
            "items": [
                { "licenseType": "Pro-2", "quantity": 3 },
                { "licenseType": "Pro-9", "quantity": 1 },
            ],
            "customerEmail": "a@x.com",
            "customerName": "Ann",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"].as_array().unwrap().len(), 2);

    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0]["licenseType"], "Pro-2");
    assert_eq!(failed[1]["licenseType"], "Pro-9");
}

#[tokio::test]
async fn test_empty_checkout_is_rejected() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        None,
        Some(json!({ "items": [], "customerEmail": "a@x.com", "customerName": "Ann" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "items");
}
