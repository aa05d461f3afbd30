//! Per-session shopping cart and the checkout that turns it into sales.
//!
//! A `Cart` is owned by whoever holds the session; there is no shared
//! instance. Observers get a fresh `CartSnapshot` after every change through a
//! `tokio::sync::watch` channel.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::Money;
use crate::purchase::{self, PurchaseReceipt, PurchaseRequest};

/// Most units a single checkout will attempt.
pub const MAX_CHECKOUT_UNITS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub license_type: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// Read-only view of a cart. `total` and `item_count` are derived from `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total: Money,
    pub item_count: u32,
}

pub struct Cart {
    items: Vec<CartItem>,
    notify: watch::Sender<CartSnapshot>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(CartSnapshot::default());
        Self {
            items: Vec::new(),
            notify,
        }
    }

    /// Add one unit. A type already in the cart gets its quantity bumped, up
    /// to `MAX_CHECKOUT_UNITS`.
    pub fn add(&mut self, license_type: &str, unit_price: Money) {
        match self.items.iter_mut().find(|i| i.license_type == license_type) {
            Some(item) => item.quantity = item.quantity.saturating_add(1).min(MAX_CHECKOUT_UNITS),
            None => self.items.push(CartItem {
                license_type: license_type.to_string(),
                unit_price,
                quantity: 1,
            }),
        }
        self.publish();
    }

    /// Set a line's quantity; zero removes the line. Unknown types are ignored.
    /// Quantities above `MAX_CHECKOUT_UNITS` are capped.
    pub fn update_quantity(&mut self, license_type: &str, quantity: u32) {
        let quantity = quantity.min(MAX_CHECKOUT_UNITS);
        if quantity == 0 {
            self.remove(license_type);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.license_type == license_type) {
            item.quantity = quantity;
            self.publish();
        }
    }

    pub fn remove(&mut self, license_type: &str) {
        self.items.retain(|i| i.license_type != license_type);
        self.publish();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.publish();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total: self
                .items
                .iter()
                .map(|i| i.unit_price.saturating_mul(i.quantity))
                .sum(),
            item_count: self
                .items
                .iter()
                .fold(0u32, |acc, i| acc.saturating_add(i.quantity)),
        }
    }

    /// Receive the snapshot after each subsequent change. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.notify.subscribe()
    }

    fn publish(&self) {
        self.notify.send_replace(self.snapshot());
    }

    /// Purchase every unit in the cart for one customer.
    ///
    /// Units that completed are taken out of the cart; on full success the cart
    /// ends up empty. Units that failed stay so the caller can retry or drop them.
    pub fn checkout(
        &mut self,
        conn: &mut Connection,
        customer: &CheckoutCustomer,
        max_attempts: u32,
    ) -> Result<CheckoutReport> {
        let lines: Vec<CheckoutLine> = self
            .items
            .iter()
            .map(|i| CheckoutLine {
                license_type: i.license_type.clone(),
                quantity: i.quantity,
            })
            .collect();

        let report = checkout(conn, &lines, customer, max_attempts)?;

        for receipt in &report.completed {
            if let Some(item) = self
                .items
                .iter_mut()
                .find(|i| i.license_type == receipt.license.license_type)
            {
                item.quantity -= 1;
            }
        }
        self.items.retain(|i| i.quantity > 0);
        self.publish();

        Ok(report)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub license_type: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCustomer {
    pub customer_email: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUnit {
    pub license_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutReport {
    pub completed: Vec<PurchaseReceipt>,
    pub failed: Vec<FailedUnit>,
}

impl CheckoutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run one independent purchase per unit.
///
/// There is no atomicity across units: an out-of-stock unit is recorded in
/// `failed` and the remaining units still go through. Storage failures abort
/// the checkout; units completed before that remain sold.
pub fn checkout(
    conn: &mut Connection,
    lines: &[CheckoutLine],
    customer: &CheckoutCustomer,
    max_attempts: u32,
) -> Result<CheckoutReport> {
    if lines.iter().any(|l| l.quantity == 0) {
        return Err(AppError::validation("items", "Quantities must be at least 1"));
    }
    let total_units: u32 = lines
        .iter()
        .fold(0u32, |acc, l| acc.saturating_add(l.quantity));
    if total_units == 0 {
        return Err(AppError::validation("items", "Cart is empty"));
    }
    if total_units > MAX_CHECKOUT_UNITS {
        return Err(AppError::validation(
            "items",
            format!("A checkout may contain at most {} units", MAX_CHECKOUT_UNITS),
        ));
    }

    // Every line is checked before the first unit is bought, so a bad line
    // can't abort a checkout that has already sold something.
    let requests = lines
        .iter()
        .map(|line| {
            let request = PurchaseRequest::new(
                line.license_type.clone(),
                customer.customer_email.clone(),
                customer.customer_name.clone(),
            );
            request.validate().map_err(|e| match e {
                AppError::Validation { field, message } if field == "licenseType" => {
                    AppError::validation("items", message)
                }
                other => other,
            })?;
            Ok((line, request))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut report = CheckoutReport::default();

    for (line, request) in &requests {
        for _ in 0..line.quantity {
            match purchase::purchase(conn, request, max_attempts) {
                Ok(receipt) => report.completed.push(receipt),
                Err(e @ AppError::OutOfStock(_)) => report.failed.push(FailedUnit {
                    license_type: line.license_type.clone(),
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        "Checkout for {}: {} completed, {} failed",
        customer.customer_email,
        report.completed.len(),
        report.failed.len()
    );

    Ok(report)
}
