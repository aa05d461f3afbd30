use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::{RequestKind, SaleRequest, UpdateRequestStatus};

pub async fn list_refund_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<SaleRequest>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_sale_requests(&conn, RequestKind::Refund)?))
}

pub async fn list_deactivation_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<SaleRequest>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_sale_requests(
        &conn,
        RequestKind::Deactivation,
    )?))
}

fn decide(
    state: &AppState,
    kind: RequestKind,
    id: i64,
    input: &UpdateRequestStatus,
) -> Result<SaleRequest> {
    input.validate()?;
    let mut conn = state.db.get()?;
    let updated = queries::update_sale_request_status(&mut conn, kind, id, input)?;
    tracing::info!("{} request {} marked {}", kind, id, updated.status);
    Ok(updated)
}

pub async fn update_refund_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRequestStatus>,
) -> Result<Json<SaleRequest>> {
    Ok(Json(decide(&state, RequestKind::Refund, id, &input)?))
}

/// Approval deactivates the sale, removing it from revenue.
pub async fn update_deactivation_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateRequestStatus>,
) -> Result<Json<SaleRequest>> {
    Ok(Json(decide(&state, RequestKind::Deactivation, id, &input)?))
}
