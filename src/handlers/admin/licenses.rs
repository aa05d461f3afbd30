use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{AddLicenses, License, UpdateLicense};

pub async fn list_licenses(State(state): State<AppState>) -> Result<Json<Vec<License>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_licenses(&conn)?))
}

/// POST /api/licenses
/// Add one license per supplied key, all of one type and price. All or nothing.
pub async fn add_licenses(
    State(state): State<AppState>,
    Json(input): Json<AddLicenses>,
) -> Result<Json<Vec<License>>> {
    let batch = input.into_batch()?;

    let mut conn = state.db.get()?;
    let created = queries::add_licenses(&mut conn, &batch)?;

    tracing::info!(
        "Added {} license(s) of type {}",
        created.len(),
        batch[0].license_type
    );

    Ok(Json(created))
}

/// PATCH /api/licenses/{id}
/// Change type, price or active flag of an unsold license. Sold ones are 409.
pub async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateLicense>,
) -> Result<Json<License>> {
    let changes = input.into_changes()?;

    let conn = state.db.get()?;
    let license = queries::update_license(&conn, id, &changes)?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    tracing::info!(
        "Updated license {} (type {}, price {}, active {})",
        license.id,
        license.license_type,
        license.price,
        license.is_active
    );

    Ok(Json(license))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    message: &'static str,
}

/// DELETE /api/licenses/{id}
/// Sold licenses are refused with 409.
pub async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let conn = state.db.get()?;

    if !queries::delete_license(&conn, id)? {
        return Err(AppError::NotFound("License not found".into()));
    }

    tracing::info!("Deleted license {}", id);

    Ok(Json(DeleteResponse {
        message: "License deleted successfully",
    }))
}
