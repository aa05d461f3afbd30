use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::error::{AppError, Result, is_constraint_violation};
use crate::models::*;

use super::from_row::{
    API_KEY_COLS, CUSTOMER_COLS, LICENSE_COLS, REQUEST_COLS, RequestRow, SALE_COLS,
    SALE_WITH_DETAILS_COLS, query_all, query_one,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Licenses ============

/// All licenses, newest first.
pub fn list_licenses(conn: &Connection) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses ORDER BY created_at DESC, id DESC",
            LICENSE_COLS
        ),
        [],
    )
}

/// Licenses that are active and unsold, lowest id first.
pub fn list_available_licenses(conn: &Connection) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE is_active = 1 AND is_sold = 0 ORDER BY id",
            LICENSE_COLS
        ),
        [],
    )
}

pub fn list_licenses_by_type(conn: &Connection, license_type: &str) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!("SELECT {} FROM licenses WHERE type = ?1 ORDER BY id", LICENSE_COLS),
        params![license_type],
    )
}

pub fn get_license_by_id(conn: &Connection, id: i64) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        params![id],
    )
}

/// The available license of a type that the next purchase should take.
///
/// Lowest id wins so repeated calls agree on which license is "next".
pub fn first_available_license_of_type(
    conn: &Connection,
    license_type: &str,
) -> Result<Option<License>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM licenses
             WHERE type = ?1 AND is_active = 1 AND is_sold = 0
             ORDER BY id LIMIT 1",
            LICENSE_COLS
        ),
        params![license_type],
    )
}

/// Insert a batch of licenses as one unit. Either every row lands or none do.
pub fn add_licenses(conn: &mut Connection, batch: &[NewLicense]) -> Result<Vec<License>> {
    let tx = conn.transaction()?;
    let now = now();
    let mut created = Vec::with_capacity(batch.len());

    for entry in batch {
        let inserted = tx.execute(
            "INSERT INTO licenses (type, license_key, price_cents, is_active, is_sold, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &entry.license_type,
                &entry.license_key,
                entry.price,
                entry.is_active,
                entry.is_sold,
                now
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                // Dropping the transaction rolls back the rows inserted so far
                return Err(AppError::validation(
                    "licenseKeys",
                    format!("License key '{}' already exists", entry.license_key),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        created.push(License {
            id: tx.last_insert_rowid(),
            license_type: entry.license_type.clone(),
            license_key: entry.license_key.clone(),
            price: entry.price,
            is_active: entry.is_active,
            is_sold: entry.is_sold,
            created_at: now,
        });
    }

    tx.commit()?;
    Ok(created)
}

/// Flip a license from unsold to sold with a single conditional update.
///
/// Returns `Ok(true)` if this call sold it, `Ok(false)` if it was already sold.
/// A missing id is `NotFound`.
pub fn mark_license_sold(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET is_sold = 1 WHERE id = ?1 AND is_sold = 0",
        params![id],
    )?;
    if affected > 0 {
        return Ok(true);
    }

    let exists: Option<i64> = conn
        .query_row("SELECT id FROM licenses WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    match exists {
        Some(_) => Ok(false),
        None => Err(AppError::NotFound("License not found".into())),
    }
}

/// Delete an unsold license.
///
/// Returns `Ok(false)` when no license has this id. Sold licenses are never
/// deleted: their sale record still points at them.
pub fn delete_license(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM licenses WHERE id = ?1 AND is_sold = 0",
        params![id],
    )?;
    if deleted > 0 {
        return Ok(true);
    }

    match get_license_by_id(conn, id)? {
        Some(license) if license.is_sold => Err(AppError::Conflict(
            "License has been sold and cannot be deleted".into(),
        )),
        Some(_) => Err(AppError::Internal(
            "License could not be deleted".into(),
        )),
        None => Ok(false),
    }
}

/// Apply edits to an unsold license.
///
/// Returns `Ok(None)` when no license has this id. A sold license is frozen:
/// its type and price belong to a recorded sale.
pub fn update_license(
    conn: &Connection,
    id: i64,
    changes: &LicenseChanges,
) -> Result<Option<License>> {
    let updated = conn.execute(
        "UPDATE licenses SET
             type = COALESCE(?1, type),
             price_cents = COALESCE(?2, price_cents),
             is_active = COALESCE(?3, is_active)
         WHERE id = ?4 AND is_sold = 0",
        params![&changes.license_type, changes.price, changes.is_active, id],
    )?;

    match get_license_by_id(conn, id)? {
        Some(license) if updated > 0 => Ok(Some(license)),
        Some(_) => Err(AppError::Conflict(
            "License has been sold and cannot be modified".into(),
        )),
        None => Ok(None),
    }
}

pub fn count_available_licenses(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE is_active = 1 AND is_sold = 0",
        [],
        |row| row.get(0),
    )?)
}

pub fn count_sold_licenses(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE is_sold = 1",
        [],
        |row| row.get(0),
    )?)
}

// ============ Customers ============

/// All customers, newest first.
pub fn list_customers(conn: &Connection) -> Result<Vec<Customer>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM customers ORDER BY created_at DESC, id DESC",
            CUSTOMER_COLS
        ),
        [],
    )
}

/// Look up a customer by email. Absence is not an error.
pub fn get_customer_by_email(conn: &Connection, email: &str) -> Result<Option<Customer>> {
    query_one(
        conn,
        &format!("SELECT {} FROM customers WHERE email = ?1", CUSTOMER_COLS),
        params![normalize_email(email)],
    )
}

/// Create a customer. An existing email is a `Conflict`; prefer
/// [`find_or_create_customer`] when either outcome is acceptable.
pub fn create_customer(conn: &Connection, input: &CreateCustomer) -> Result<Customer> {
    let email = normalize_email(&input.email);
    let name = input.name.trim().to_string();
    let now = now();

    match conn.execute(
        "INSERT INTO customers (email, name, created_at) VALUES (?1, ?2, ?3)",
        params![&email, &name, now],
    ) {
        Ok(_) => {}
        Err(e) if is_constraint_violation(&e) => {
            return Err(AppError::Conflict(
                "A customer with this email already exists".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Customer {
        id: conn.last_insert_rowid(),
        email,
        name,
        created_at: now,
    })
}

/// Return the customer with this email, creating it if absent.
///
/// Concurrent callers with the same new email converge on one row: the insert
/// is ignored on conflict and the winner's row is read back.
pub fn find_or_create_customer(conn: &Connection, input: &CreateCustomer) -> Result<Customer> {
    if let Some(existing) = get_customer_by_email(conn, &input.email)? {
        return Ok(existing);
    }

    conn.execute(
        "INSERT INTO customers (email, name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(email) DO NOTHING",
        params![normalize_email(&input.email), input.name.trim(), now()],
    )?;

    get_customer_by_email(conn, &input.email)?
        .ok_or_else(|| AppError::Internal("Customer vanished after insert".into()))
}

pub fn count_customers_created_since(conn: &Connection, since: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM customers WHERE created_at >= ?1",
        params![since],
        |row| row.get(0),
    )?)
}

// ============ Sales ============

/// Insert a sale row. The caller owns marking the license sold in the same
/// transaction.
pub fn create_sale(conn: &Connection, input: &CreateSale) -> Result<Sale> {
    let now = now();
    conn.execute(
        "INSERT INTO sales (license_id, customer_id, amount_cents, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.license_id,
            input.customer_id,
            input.amount,
            input.status.as_ref(),
            now
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::Conflict("License already has a sale recorded".into())
        } else {
            e.into()
        }
    })?;

    Ok(Sale {
        id: conn.last_insert_rowid(),
        license_id: input.license_id,
        customer_id: input.customer_id,
        amount: input.amount,
        status: input.status,
        created_at: now,
    })
}

pub fn get_sale_by_id(conn: &Connection, id: i64) -> Result<Option<Sale>> {
    query_one(
        conn,
        &format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLS),
        params![id],
    )
}

/// All sales, newest first.
pub fn list_sales(conn: &Connection) -> Result<Vec<Sale>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM sales ORDER BY created_at DESC, id DESC",
            SALE_COLS
        ),
        [],
    )
}

/// Most recent sales with their license and customer, newest first.
pub fn list_recent_sales(conn: &Connection, limit: i64) -> Result<Vec<SaleWithDetails>> {
    query_all(
        conn,
        &format!(
            "SELECT {}
             FROM sales s
             JOIN licenses l ON l.id = s.license_id
             JOIN customers c ON c.id = s.customer_id
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT ?1",
            SALE_WITH_DETAILS_COLS
        ),
        params![limit],
    )
}

/// Sales bought under an email address, newest first.
pub fn list_sales_for_customer_email(
    conn: &Connection,
    email: &str,
) -> Result<Vec<SaleWithDetails>> {
    query_all(
        conn,
        &format!(
            "SELECT {}
             FROM sales s
             JOIN licenses l ON l.id = s.license_id
             JOIN customers c ON c.id = s.customer_id
             WHERE c.email = ?1
             ORDER BY s.created_at DESC, s.id DESC",
            SALE_WITH_DETAILS_COLS
        ),
        params![normalize_email(email)],
    )
}

pub fn set_sale_status(conn: &Connection, id: i64, status: SaleStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE sales SET status = ?1 WHERE id = ?2",
        params![status.as_ref(), id],
    )?;
    Ok(affected > 0)
}

/// Sum of amounts over active sales. Zero when there are none.
pub fn total_active_revenue(conn: &Connection) -> Result<Money> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM sales WHERE status = ?1",
        params![SaleStatus::Active.as_ref()],
        |row| row.get(0),
    )?)
}

// ============ API Keys ============

/// Generate a new plaintext API key: `ks_` followed by 64 hex chars.
pub fn generate_api_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("ks_{}", hex::encode(bytes))
}

/// Keys are only ever stored hashed.
pub fn hash_api_key(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"keyshop-api-key-v1:");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint an API key. The plaintext is returned once and never stored.
pub fn create_api_key(conn: &Connection, email: &str, role: Role) -> Result<(ApiKey, String)> {
    let key = generate_api_key();
    let key_hash = hash_api_key(&key);
    let email = normalize_email(email);
    let now = now();

    conn.execute(
        "INSERT INTO api_keys (key_hash, email, role, revoked, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![&key_hash, &email, role.as_ref(), now],
    )?;

    Ok((
        ApiKey {
            id: conn.last_insert_rowid(),
            email,
            role,
            key_hash,
            revoked: false,
            created_at: now,
        },
        key,
    ))
}

/// Resolve a presented key to its non-revoked record.
pub fn get_api_key_by_key(conn: &Connection, key: &str) -> Result<Option<ApiKey>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM api_keys WHERE key_hash = ?1 AND revoked = 0",
            API_KEY_COLS
        ),
        params![hash_api_key(key)],
    )
}

pub fn count_api_keys_with_role(conn: &Connection, role: Role) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM api_keys WHERE role = ?1 AND revoked = 0",
        params![role.as_ref()],
        |row| row.get(0),
    )?)
}

pub fn revoke_api_key(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE api_keys SET revoked = 1 WHERE id = ?1 AND revoked = 0",
        params![id],
    )?;
    Ok(affected > 0)
}

// ============ Refund / Deactivation Requests ============

pub fn create_sale_request(
    conn: &Connection,
    kind: RequestKind,
    customer_email: &str,
    input: &CreateSaleRequest,
) -> Result<SaleRequest> {
    let now = now();
    let customer_email = normalize_email(customer_email);
    let reason = input.reason.trim().to_string();

    conn.execute(
        &format!(
            "INSERT INTO {}
                 (sale_id, customer_email, reason, status, admin_notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            kind.table()
        ),
        params![
            input.sale_id,
            &customer_email,
            &reason,
            RequestStatus::Pending.as_ref(),
            now
        ],
    )?;

    Ok(SaleRequest {
        id: conn.last_insert_rowid(),
        kind,
        sale_id: input.sale_id,
        customer_email,
        reason,
        status: RequestStatus::Pending,
        admin_notes: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_sale_request(
    conn: &Connection,
    kind: RequestKind,
    id: i64,
) -> Result<Option<SaleRequest>> {
    let row: Option<RequestRow> = query_one(
        conn,
        &format!("SELECT {} FROM {} WHERE id = ?1", REQUEST_COLS, kind.table()),
        params![id],
    )?;
    Ok(row.map(|r| r.with_kind(kind)))
}

/// Requests of one kind, newest first.
pub fn list_sale_requests(conn: &Connection, kind: RequestKind) -> Result<Vec<SaleRequest>> {
    let rows: Vec<RequestRow> = query_all(
        conn,
        &format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC",
            REQUEST_COLS,
            kind.table()
        ),
        [],
    )?;
    Ok(rows.into_iter().map(|r| r.with_kind(kind)).collect())
}

/// Decide a pending request.
///
/// Approving a deactivation request also deactivates its sale, in the same
/// transaction, which takes the sale out of revenue.
pub fn update_sale_request_status(
    conn: &mut Connection,
    kind: RequestKind,
    id: i64,
    input: &UpdateRequestStatus,
) -> Result<SaleRequest> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = get_sale_request(&tx, kind, id)?
        .ok_or_else(|| AppError::NotFound(format!("{} request not found", kind)))?;

    if existing.status != RequestStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Request has already been {}",
            existing.status
        )));
    }

    let now = now();
    tx.execute(
        &format!(
            "UPDATE {} SET status = ?1, admin_notes = ?2, updated_at = ?3 WHERE id = ?4",
            kind.table()
        ),
        params![input.status.as_ref(), &input.admin_notes, now, id],
    )?;

    if kind == RequestKind::Deactivation && input.status == RequestStatus::Approved {
        set_sale_status(&tx, existing.sale_id, SaleStatus::Deactivated)?;
    }

    tx.commit()?;

    Ok(SaleRequest {
        status: input.status,
        admin_notes: input.admin_notes.clone(),
        updated_at: now,
        ..existing
    })
}
