use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

struct Shop {
    _dir: tempfile::TempDir,
    app: axum::Router,
    admin: String,
    customer: String,
    sale_id: i64,
}

/// One admin, one customer who has bought a single Pro-2 license.
async fn shop() -> Shop {
    let (dir, state) = test_state();
    {
        let mut conn = state.db.get().unwrap();
        add_licenses(&mut conn, "Pro-2", &["A-1", "A-2"], "100.00");
    }
    let admin = create_key(&state, "admin@x.com", Role::Admin);
    let customer = create_key(&state, "ann@x.com", Role::Customer);
    let app = keyshop::app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(json!({
            "licenseType": "Pro-2",
            "customerEmail": "ann@x.com",
            "customerName": "Ann",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sale_id = body["sale"]["id"].as_i64().unwrap();

    Shop {
        _dir: dir,
        app,
        admin,
        customer,
        sale_id,
    }
}

#[tokio::test]
async fn test_customer_sees_only_own_sales() {
    let shop = shop().await;

    let customer = Some(shop.customer.as_str());
    let (status, body) = send(&shop.app, "GET", "/api/account/sales", customer, None).await;
    assert_eq!(status, StatusCode::OK);
    let sales = body.as_array().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["id"], shop.sale_id);
    assert_eq!(sales[0]["license"]["licenseKey"], "A-1");

    let (_, body) = send(&shop.app, "GET", "/api/account/sales", Some(&shop.admin), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_request_for_someone_elses_sale_is_not_found() {
    let shop = shop().await;

    let (status, _) = send(
        &shop.app,
        "POST",
        "/api/account/refund-requests",
        Some(&shop.admin),
        Some(json!({ "saleId": shop.sale_id, "reason": "not mine" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &shop.app,
        "POST",
        "/api/account/refund-requests",
        Some(&shop.customer),
        Some(json!({ "saleId": shop.sale_id, "reason": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "reason");
}

#[tokio::test]
async fn test_refund_approval_records_decision_only() {
    let shop = shop().await;

    let (status, request) = send(
        &shop.app,
        "POST",
        "/api/account/refund-requests",
        Some(&shop.customer),
        Some(json!({ "saleId": shop.sale_id, "reason": "changed my mind" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "pending");
    assert_eq!(request["kind"], "refund");

    let (_, listed) = send(&shop.app, "GET", "/api/refund-requests", Some(&shop.admin), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let uri = format!("/api/refund-requests/{}", request["id"]);
    let (status, decided) = send(
        &shop.app,
        "PUT",
        &uri,
        Some(&shop.admin),
        Some(json!({ "status": "approved", "adminNotes": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["adminNotes"], "ok");

    let admin = Some(shop.admin.as_str());
    let (_, metrics) = send(&shop.app, "GET", "/api/dashboard/metrics", admin, None).await;
    assert_eq!(metrics["totalSales"], "100.00");

    let (status, _) = send(
        &shop.app,
        "PUT",
        &uri,
        Some(&shop.admin),
        Some(json!({ "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deactivation_approval_removes_revenue() {
    let shop = shop().await;

    let (_, request) = send(
        &shop.app,
        "POST",
        "/api/account/deactivation-requests",
        Some(&shop.customer),
        Some(json!({ "saleId": shop.sale_id, "reason": "lost machine" })),
    )
    .await;
    let uri = format!("/api/deactivation-requests/{}", request["id"]);

    let (status, body) = send(
        &shop.app,
        "PUT",
        &uri,
        Some(&shop.admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "status");

    let (status, _) = send(
        &shop.app,
        "PUT",
        &uri,
        Some(&shop.customer),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &shop.app,
        "PUT",
        &uri,
        Some(&shop.admin),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let admin = Some(shop.admin.as_str());
    let (_, metrics) = send(&shop.app, "GET", "/api/dashboard/metrics", admin, None).await;
    assert_eq!(metrics["totalSales"], "0.00");
    assert_eq!(metrics["licensesSold"], 1);

    let (_, sales) = send(&shop.app, "GET", "/api/account/sales", Some(&shop.customer), None).await;
    assert_eq!(sales[0]["status"], "deactivated");

    let (status, _) = send(
        &shop.app,
        "PUT",
        "/api/deactivation-requests/9999",
        Some(&shop.admin),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
