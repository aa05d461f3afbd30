use serde::{Deserialize, Serialize};

use super::Money;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: i64,
    #[serde(rename = "type")]
    pub license_type: String,
    pub license_key: String,
    pub price: Money,
    pub is_active: bool,
    pub is_sold: bool,
    pub created_at: i64,
}

impl License {
    /// Active and not yet sold.
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_sold
    }
}

/// One row of an inventory batch.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub license_type: String,
    pub license_key: String,
    pub price: Money,
    pub is_active: bool,
    pub is_sold: bool,
}

/// Request body for adding a batch of keys of one type at one price.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLicenses {
    #[serde(rename = "type")]
    pub license_type: String,
    pub license_keys: Vec<String>,
    pub price: String,
}

impl AddLicenses {
    /// Validate the request and expand it into one `NewLicense` per key.
    pub fn into_batch(self) -> Result<Vec<NewLicense>> {
        let license_type = self.license_type.trim().to_string();
        if license_type.is_empty() {
            return Err(AppError::validation("type", "License type is required"));
        }

        let price: Money = self
            .price
            .parse()
            .map_err(|e: super::MoneyParseError| AppError::validation("price", e.to_string()))?;

        if self.license_keys.is_empty() {
            return Err(AppError::validation(
                "licenseKeys",
                "At least one license key is required",
            ));
        }

        let mut seen = std::collections::HashSet::with_capacity(self.license_keys.len());
        let mut batch = Vec::with_capacity(self.license_keys.len());
        for key in self.license_keys {
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(AppError::validation(
                    "licenseKeys",
                    "License keys must not be empty",
                ));
            }
            if !seen.insert(key.clone()) {
                return Err(AppError::validation(
                    "licenseKeys",
                    format!("License key '{}' appears more than once", key),
                ));
            }
            batch.push(NewLicense {
                license_type: license_type.clone(),
                license_key: key,
                price,
                is_active: true,
                is_sold: false,
            });
        }

        Ok(batch)
    }
}

/// Request body for editing an unsold license. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLicense {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub price: Option<String>,
    pub is_active: Option<bool>,
}

/// Validated form of [`UpdateLicense`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseChanges {
    pub license_type: Option<String>,
    pub price: Option<Money>,
    pub is_active: Option<bool>,
}

impl UpdateLicense {
    pub fn into_changes(self) -> Result<LicenseChanges> {
        let license_type = match self.license_type {
            Some(t) if t.trim().is_empty() => {
                return Err(AppError::validation("type", "License type is required"));
            }
            Some(t) => Some(t.trim().to_string()),
            None => None,
        };

        let price = self
            .price
            .map(|p| p.parse::<Money>())
            .transpose()
            .map_err(|e| AppError::validation("price", e.to_string()))?;

        if license_type.is_none() && price.is_none() && self.is_active.is_none() {
            return Err(AppError::BadRequest("No changes supplied".into()));
        }

        Ok(LicenseChanges {
            license_type,
            price,
            is_active: self.is_active,
        })
    }
}
