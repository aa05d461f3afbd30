use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::models::{License, Money};

/// All available licenses of one type, presented as one product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogGroup {
    #[serde(rename = "type")]
    pub license_type: String,
    pub price: Money,
    pub count: u32,
    pub sample: License,
}

/// Group licenses by type in first-encounter order.
///
/// The group's price comes from the first row seen; every license of a type
/// is expected to carry the same price.
pub fn group_by_type(licenses: impl IntoIterator<Item = License>) -> Vec<CatalogGroup> {
    let mut groups: Vec<CatalogGroup> = Vec::new();

    for license in licenses {
        match groups
            .iter_mut()
            .find(|g| g.license_type == license.license_type)
        {
            Some(group) => group.count += 1,
            None => groups.push(CatalogGroup {
                license_type: license.license_type.clone(),
                price: license.price,
                count: 1,
                sample: license,
            }),
        }
    }

    groups
}

/// Purchasable product lines. Types with nothing available are absent.
pub fn available_catalog(conn: &Connection) -> Result<Vec<CatalogGroup>> {
    let available = queries::list_available_licenses(conn)?;
    Ok(group_by_type(available))
}
