pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod purchase;
pub mod reporting;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;

/// The full HTTP application: storefront, customer account, and admin routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::store::router())
        .merge(handlers::account::router(state.clone()))
        .merge(handlers::admin::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
