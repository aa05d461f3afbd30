mod customers;
mod licenses;
mod requests;
mod sales;

pub use customers::*;
pub use licenses::*;
pub use requests::*;
pub use sales::*;

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};

use crate::db::AppState;
use crate::middleware::require_role;
use crate::models::Role;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // Inventory
        .route("/api/licenses", get(list_licenses))
        .route("/api/licenses", post(add_licenses))
        .route(
            "/api/licenses/{id}",
            patch(update_license).delete(delete_license),
        )
        // Customers
        .route("/api/customers", get(list_customers))
        .route("/api/customers", post(register_customer))
        // Ledger
        .route("/api/sales", get(list_sales))
        .route("/api/sales/recent", get(list_recent_sales))
        // Dashboard
        .route("/api/dashboard/metrics", get(get_dashboard_metrics))
        .route("/api/dashboard/activity", get(get_recent_activity))
        // Refund / deactivation review
        .route("/api/refund-requests", get(list_refund_requests))
        .route("/api/refund-requests/{id}", put(update_refund_request))
        .route("/api/deactivation-requests", get(list_deactivation_requests))
        .route(
            "/api/deactivation-requests/{id}",
            put(update_deactivation_request),
        )
        .layer(middleware::from_fn_with_state(
            (state, Role::Admin),
            require_role,
        ))
}
