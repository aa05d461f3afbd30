use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::models::Money;

const SECONDS_PER_DAY: i64 = 86400;

pub const DEFAULT_NEW_CUSTOMER_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_RECENT_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Revenue from active sales only.
    pub total_sales: Money,
    pub available_licenses: i64,
    pub licenses_sold: i64,
    pub new_customers: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub timestamp: i64,
}

pub fn dashboard_metrics(
    conn: &Connection,
    new_customer_window_days: i64,
) -> Result<DashboardMetrics> {
    let since = queries::now() - new_customer_window_days.max(0) * SECONDS_PER_DAY;

    Ok(DashboardMetrics {
        total_sales: queries::total_active_revenue(conn)?,
        available_licenses: queries::count_available_licenses(conn)?,
        licenses_sold: queries::count_sold_licenses(conn)?,
        new_customers: queries::count_customers_created_since(conn, since)?,
    })
}

/// Feed of the latest sales, newest first.
pub fn recent_activity(conn: &Connection, limit: i64) -> Result<Vec<Activity>> {
    let sales = queries::list_recent_sales(conn, limit)?;
    Ok(sales
        .into_iter()
        .map(|s| Activity {
            kind: "sale",
            description: format!("{} sold to {}", s.license.license_type, s.customer.name),
            timestamp: s.sale.created_at,
        })
        .collect())
}

/// Clamp a caller-supplied `limit` to `1..=max`, defaulting when absent.
pub fn clamp_limit(limit: Option<i64>, max: i64) -> i64 {
    limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, max.max(1))
}
