//! License allocation: turn "one unit of type T for customer C" into a sale.
//!
//! The customer is resolved first and kept even if allocation fails. The
//! allocation itself (pick license, insert sale, flip license to sold) runs in
//! one IMMEDIATE transaction. The flip is a conditional update; if it finds
//! the license already sold, the transaction is rolled back and a different
//! license is picked, up to `max_attempts` times.
//!
//! While every writer goes through `allocate`, the write lock keeps the
//! conditional update from losing. The retry covers rows changed behind its
//! back: a license flipped by another process, or a sale row already pointing
//! at a license that is still marked unsold.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{CreateCustomer, CreateSale, Customer, License, Sale, SaleStatus};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub license_type: String,
    pub customer_email: String,
    pub customer_name: String,
}

impl PurchaseRequest {
    pub fn new(
        license_type: impl Into<String>,
        customer_email: impl Into<String>,
        customer_name: impl Into<String>,
    ) -> Self {
        Self {
            license_type: license_type.into(),
            customer_email: customer_email.into(),
            customer_name: customer_name.into(),
        }
    }

    fn customer(&self) -> CreateCustomer {
        CreateCustomer::new(self.customer_email.clone(), self.customer_name.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.license_type.trim().is_empty() {
            return Err(AppError::validation("licenseType", "License type is required"));
        }
        self.customer().validate().map_err(|e| match e {
            AppError::Validation { field, message } if field == "email" => {
                AppError::validation("customerEmail", message)
            }
            AppError::Validation { field, message } if field == "name" => {
                AppError::validation("customerName", message)
            }
            other => other,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub sale: Sale,
    pub license: License,
    pub customer: Customer,
}

/// Outcome of one allocation attempt inside the critical section.
enum Allocation {
    Sold(Sale, License),
    NoneAvailable,
    LostRace(i64),
}

/// Sell one license of `request.license_type` to the requesting customer.
pub fn purchase(
    conn: &mut Connection,
    request: &PurchaseRequest,
    max_attempts: u32,
) -> Result<PurchaseReceipt> {
    request.validate()?;
    let license_type = request.license_type.trim();

    let customer = queries::find_or_create_customer(conn, &request.customer())?;

    for attempt in 1..=max_attempts.max(1) {
        match allocate(conn, license_type, &customer)? {
            Allocation::Sold(sale, license) => {
                tracing::info!(
                    "Sold license {} ({}) to customer {} as sale {} for {}",
                    license.id,
                    license.license_type,
                    customer.id,
                    sale.id,
                    sale.amount
                );
                return Ok(PurchaseReceipt {
                    sale,
                    license: License {
                        is_sold: true,
                        ..license
                    },
                    customer,
                });
            }
            Allocation::NoneAvailable => break,
            Allocation::LostRace(license_id) => {
                tracing::warn!(
                    "License {} was sold concurrently (attempt {}/{}), retrying",
                    license_id,
                    attempt,
                    max_attempts
                );
            }
        }
    }

    tracing::warn!("Purchase of '{}' failed: out of stock", license_type);
    Err(AppError::OutOfStock(license_type.to_string()))
}

fn allocate(
    conn: &mut Connection,
    license_type: &str,
    customer: &Customer,
) -> Result<Allocation> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(license) = queries::first_available_license_of_type(&tx, license_type)? else {
        return Ok(Allocation::NoneAvailable);
    };

    let sale = queries::create_sale(
        &tx,
        &CreateSale {
            license_id: license.id,
            customer_id: customer.id,
            amount: license.price,
            status: SaleStatus::Active,
        },
    );
    let sale = match sale {
        Ok(sale) => sale,
        // Another sale already references this license
        Err(AppError::Conflict(_)) => return Ok(Allocation::LostRace(license.id)),
        Err(e) => return Err(e),
    };

    if !queries::mark_license_sold(&tx, license.id)? {
        // Dropping the transaction discards the sale row
        return Ok(Allocation::LostRace(license.id));
    }

    tx.commit()?;
    Ok(Allocation::Sold(sale, license))
}
