use axum::extract::State;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::models::{Sale, SaleWithDetails};
use crate::reporting::{self, Activity, DashboardMetrics};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn list_sales(State(state): State<AppState>) -> Result<Json<Vec<Sale>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_sales(&conn)?))
}

pub async fn list_recent_sales(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SaleWithDetails>>> {
    let limit = reporting::clamp_limit(query.limit, state.recent_limit_max);
    let conn = state.db.get()?;
    Ok(Json(queries::list_recent_sales(&conn, limit)?))
}

pub async fn get_dashboard_metrics(
    State(state): State<AppState>,
) -> Result<Json<DashboardMetrics>> {
    let conn = state.db.get()?;
    Ok(Json(reporting::dashboard_metrics(
        &conn,
        state.new_customer_window_days,
    )?))
}

pub async fn get_recent_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Activity>>> {
    let limit = reporting::clamp_limit(query.limit, state.recent_limit_max);
    let conn = state.db.get()?;
    Ok(Json(reporting::recent_activity(&conn, limit)?))
}
