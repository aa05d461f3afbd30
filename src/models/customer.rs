use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomer {
    pub email: String,
    pub name: String,
}

impl CreateCustomer {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }
        Ok(())
    }
}

/// Emails are compared case-insensitively; this is the stored form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || AppError::validation("email", "A valid email is required");
    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}
