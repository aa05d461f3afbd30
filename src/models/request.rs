//! Customer-initiated refund and deactivation requests, reviewed by an admin.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{AppError, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Which request table a record lives in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    Refund,
    Deactivation,
}

impl RequestKind {
    pub fn table(self) -> &'static str {
        match self {
            RequestKind::Refund => "refund_requests",
            RequestKind::Deactivation => "deactivation_requests",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub id: i64,
    pub kind: RequestKind,
    pub sale_id: i64,
    pub customer_email: String,
    pub reason: String,
    pub status: RequestStatus,
    pub admin_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub sale_id: i64,
    pub reason: String,
}

impl CreateSaleRequest {
    pub fn validate(&self) -> Result<()> {
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("reason", "A reason is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestStatus {
    pub status: RequestStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

impl UpdateRequestStatus {
    pub fn validate(&self) -> Result<()> {
        if self.status == RequestStatus::Pending {
            return Err(AppError::validation(
                "status",
                "Status must be approved or rejected",
            ));
        }
        Ok(())
    }
}
