//! Public storefront: catalog, single purchases, and cart checkout.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::cart::{self, CheckoutCustomer, CheckoutLine, CheckoutReport};
use crate::catalog::{self, CatalogGroup};
use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::purchase::{self, PurchaseReceipt, PurchaseRequest};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_available_catalog(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogGroup>>> {
    let conn = state.db.get()?;
    Ok(Json(catalog::available_catalog(&conn)?))
}

/// POST /api/sales
/// Buy one license of a type. Responds 400 when the type is out of stock.
pub async fn purchase_license(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseReceipt>> {
    let mut conn = state.db.get()?;
    let receipt = purchase::purchase(&mut conn, &request, state.purchase_max_attempts)?;
    Ok(Json(receipt))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub items: Vec<CheckoutLine>,
    #[serde(flatten)]
    pub customer: CheckoutCustomer,
}

/// POST /api/checkout
/// One purchase per unit; the report lists which units succeeded and which didn't.
pub async fn checkout_cart(
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutReport>> {
    let mut conn = state.db.get()?;
    let report = cart::checkout(
        &mut conn,
        &body.items,
        &body.customer,
        state.purchase_max_attempts,
    )?;
    Ok(Json(report))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/licenses/available", get(get_available_catalog))
        .route("/api/sales", post(purchase_license))
        .route("/api/checkout", post(checkout_cart))
}
