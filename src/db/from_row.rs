use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::*;

/// Build a model from a row selected with the matching `*_COLS` list.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Parse a TEXT column into a strum enum, reporting failures as a conversion error.
fn parse_enum<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub const LICENSE_COLS: &str =
    "id, type, license_key, price_cents, is_active, is_sold, created_at";

pub const CUSTOMER_COLS: &str = "id, email, name, created_at";

pub const SALE_COLS: &str = "id, license_id, customer_id, amount_cents, status, created_at";

pub const API_KEY_COLS: &str = "id, email, role, key_hash, revoked, created_at";

pub const REQUEST_COLS: &str =
    "id, sale_id, customer_email, reason, status, admin_notes, created_at, updated_at";

/// Joined columns for sale + license + customer, in `SaleWithDetails` order.
pub const SALE_WITH_DETAILS_COLS: &str =
    "s.id, s.license_id, s.customer_id, s.amount_cents, s.status, s.created_at,
     l.id, l.type, l.license_key, l.price_cents, l.is_active, l.is_sold, l.created_at,
     c.id, c.email, c.name, c.created_at";

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            license_type: row.get(1)?,
            license_key: row.get(2)?,
            price: row.get(3)?,
            is_active: row.get(4)?,
            is_sold: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for Customer {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Customer {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl FromRow for Sale {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Sale {
            id: row.get(0)?,
            license_id: row.get(1)?,
            customer_id: row.get(2)?,
            amount: row.get(3)?,
            status: parse_enum(row, 4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for SaleWithDetails {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(SaleWithDetails {
            sale: Sale::from_row(row)?,
            license: License {
                id: row.get(6)?,
                license_type: row.get(7)?,
                license_key: row.get(8)?,
                price: row.get(9)?,
                is_active: row.get(10)?,
                is_sold: row.get(11)?,
                created_at: row.get(12)?,
            },
            customer: Customer {
                id: row.get(13)?,
                email: row.get(14)?,
                name: row.get(15)?,
                created_at: row.get(16)?,
            },
        })
    }
}

impl FromRow for ApiKey {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ApiKey {
            id: row.get(0)?,
            email: row.get(1)?,
            role: parse_enum(row, 2)?,
            key_hash: row.get(3)?,
            revoked: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// Request rows don't carry their kind; callers attach it after loading.
pub(crate) struct RequestRow {
    pub id: i64,
    pub sale_id: i64,
    pub customer_email: String,
    pub reason: String,
    pub status: RequestStatus,
    pub admin_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RequestRow {
    pub fn with_kind(self, kind: RequestKind) -> SaleRequest {
        SaleRequest {
            id: self.id,
            kind,
            sale_id: self.sale_id,
            customer_email: self.customer_email,
            reason: self.reason,
            status: self.status,
            admin_notes: self.admin_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FromRow for RequestRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RequestRow {
            id: row.get(0)?,
            sale_id: row.get(1)?,
            customer_email: row.get(2)?,
            reason: row.get(3)?,
            status: parse_enum(row, 4)?,
            admin_notes: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| T::from_row(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
