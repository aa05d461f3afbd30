mod from_row;
pub mod queries;
mod schema;

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use from_row::{FromRow, query_all, query_one};
pub use schema::init_db;

use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Trailing window for the dashboard's "new customers" figure.
    pub new_customer_window_days: i64,
    /// Upper bound accepted for `limit` on recent sales/activity.
    pub recent_limit_max: i64,
    /// Allocation attempts before a purchase gives up as out of stock.
    pub purchase_max_attempts: u32,
}

impl AppState {
    pub fn new(db: DbPool, config: &Config) -> Self {
        Self {
            db,
            new_customer_window_days: config.new_customer_window_days,
            recent_limit_max: config.recent_limit_max,
            purchase_max_attempts: config.purchase_max_attempts,
        }
    }
}

fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

/// Open a pool on a SQLite file and make sure the schema exists.
pub fn create_pool(path: impl AsRef<Path>, max_size: u32) -> crate::error::Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
    let pool = Pool::builder().max_size(max_size).build(manager)?;

    let conn = pool.get()?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    init_db(&conn)?;

    Ok(pool)
}
