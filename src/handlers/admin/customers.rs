use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{CreateCustomer, Customer};

pub async fn list_customers(State(state): State<AppState>) -> Result<Json<Vec<Customer>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_customers(&conn)?))
}

/// POST /api/customers
/// Registers a customer, or returns the existing record for that email.
pub async fn register_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomer>,
) -> Result<Json<Customer>> {
    input.validate()?;
    let conn = state.db.get()?;
    Ok(Json(queries::find_or_create_customer(&conn, &input)?))
}
