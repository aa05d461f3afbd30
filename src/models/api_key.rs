use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Capability a route requires and a caller holds.
///
/// Ordered so that a higher role satisfies every lower requirement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRefStr,
    EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    None,
    Customer,
    Admin,
}

impl Role {
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub revoked: bool,
    pub created_at: i64,
}
