//! Routes acting on the authenticated customer's own purchases.

use axum::{
    Router,
    extract::{Extension, State},
    middleware,
    routing::{get, post},
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::{RequestContext, require_role};
use crate::models::{CreateSaleRequest, RequestKind, Role, SaleRequest, SaleWithDetails};

pub async fn list_my_sales(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<SaleWithDetails>>> {
    let email = ctx.require_email()?;
    let conn = state.db.get()?;
    Ok(Json(queries::list_sales_for_customer_email(&conn, email)?))
}

fn open_request(
    state: &AppState,
    ctx: &RequestContext,
    kind: RequestKind,
    input: &CreateSaleRequest,
) -> Result<SaleRequest> {
    input.validate()?;
    let email = ctx.require_email()?;
    let conn = state.db.get()?;

    // Only the buyer may ask about a sale; anyone else sees it as missing
    let owns_sale = queries::list_sales_for_customer_email(&conn, email)?
        .iter()
        .any(|s| s.sale.id == input.sale_id);
    if !owns_sale {
        return Err(AppError::NotFound("Sale not found".into()));
    }

    let request = queries::create_sale_request(&conn, kind, email, input)?;
    tracing::info!(
        "Opened {} request {} for sale {}",
        kind,
        request.id,
        request.sale_id
    );
    Ok(request)
}

pub async fn create_refund_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CreateSaleRequest>,
) -> Result<Json<SaleRequest>> {
    Ok(Json(open_request(&state, &ctx, RequestKind::Refund, &input)?))
}

pub async fn create_deactivation_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CreateSaleRequest>,
) -> Result<Json<SaleRequest>> {
    Ok(Json(open_request(&state, &ctx, RequestKind::Deactivation, &input)?))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/account/sales", get(list_my_sales))
        .route("/api/account/refund-requests", post(create_refund_request))
        .route(
            "/api/account/deactivation-requests",
            post(create_deactivation_request),
        )
        .layer(middleware::from_fn_with_state(
            (state, Role::Customer),
            require_role,
        ))
}
