use std::env;

use crate::purchase::DEFAULT_MAX_ATTEMPTS;
use crate::reporting::DEFAULT_NEW_CUSTOMER_WINDOW_DAYS;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub db_pool_size: u32,
    /// Mint an admin key for this email on startup if no admin key exists
    pub bootstrap_admin_email: Option<String>,
    /// Trailing window (days) for the dashboard's new-customer count
    pub new_customer_window_days: i64,
    /// Largest `limit` accepted by recent sales/activity
    pub recent_limit_max: i64,
    pub purchase_max_attempts: u32,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3000),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "keyshop.db".to_string()),
            db_pool_size: parse_var("DB_POOL_SIZE", 8),
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            new_customer_window_days: parse_var(
                "NEW_CUSTOMER_WINDOW_DAYS",
                DEFAULT_NEW_CUSTOMER_WINDOW_DAYS,
            ),
            recent_limit_max: parse_var("RECENT_LIMIT_MAX", 100),
            purchase_max_attempts: parse_var("PURCHASE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: "keyshop.db".to_string(),
            db_pool_size: 8,
            bootstrap_admin_email: None,
            new_customer_window_days: DEFAULT_NEW_CUSTOMER_WINDOW_DAYS,
            recent_limit_max: 100,
            purchase_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
