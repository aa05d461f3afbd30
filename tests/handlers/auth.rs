use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_admin_routes_require_a_key() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    for uri in [
        "/api/licenses",
        "/api/customers",
        "/api/sales",
        "/api/sales/recent",
        "/api/dashboard/metrics",
        "/api/dashboard/activity",
        "/api/refund-requests",
        "/api/deactivation-requests",
    ] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_unknown_key_is_unauthorized() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, _) = send(&app, "GET", "/api/licenses", Some("ks_bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_key_is_forbidden_on_admin_routes() {
    let (_dir, state) = test_state();
    let key = create_key(&state, "cust@x.com", Role::Customer);
    let app = keyshop::app(state);

    let (status, body) = send(&app, "GET", "/api/licenses", Some(&key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = send(
        &app,
        "POST",
        "/api/licenses",
        Some(&key),
        Some(json!({ "type": "Pro-2", "licenseKeys": ["K"], "price": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_key_passes_admin_and_customer_gates() {
    let (_dir, state) = test_state();
    let key = create_key(&state, "admin@x.com", Role::Admin);
    let app = keyshop::app(state);

    let (status, _) = send(&app, "GET", "/api/licenses", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/account/sales", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_account_routes_require_a_key() {
    let (_dir, state) = test_state();
    let app = keyshop::app(state);

    let (status, _) = send(&app, "GET", "/api/account/sales", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_key_is_rejected() {
    let (_dir, state) = test_state();
    let (record, key) = {
        let conn = state.db.get().unwrap();
        queries::create_api_key(&conn, "admin@x.com", Role::Admin).unwrap()
    };
    let app = keyshop::app(state.clone());

    let (status, _) = send(&app, "GET", "/api/licenses", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);

    {
        let conn = state.db.get().unwrap();
        assert!(queries::revoke_api_key(&conn, record.id).unwrap());
        assert!(!queries::revoke_api_key(&conn, record.id).unwrap());
        assert!(!queries::revoke_api_key(&conn, 9999).unwrap());
    }

    let (status, _) = send(&app, "GET", "/api/licenses", Some(&key), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_purchase_shares_path_with_admin_listing() {
    let (_dir, state) = test_state();
    {
        let mut conn = state.db.get().unwrap();
        add_licenses(&mut conn, "Pro-2", &["A-1"], "5.00");
    }
    let admin = create_key(&state, "admin@x.com", Role::Admin);
    let app = keyshop::app(state);

    let (status, _) = send(
        &app,
        "POST",
        "/api/sales",
        None,
        Some(json!({
            "licenseType": "Pro-2",
            "customerEmail": "a@x.com",
            "customerName": "Ann",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/sales", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/sales", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}
