use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::{Customer, License, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SaleStatus {
    Active,
    Deactivated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub license_id: i64,
    pub customer_id: i64,
    /// Price captured when the sale was recorded.
    pub amount: Money,
    pub status: SaleStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreateSale {
    pub license_id: i64,
    pub customer_id: i64,
    pub amount: Money,
    pub status: SaleStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleWithDetails {
    #[serde(flatten)]
    pub sale: Sale,
    pub license: License,
    pub customer: Customer,
}
