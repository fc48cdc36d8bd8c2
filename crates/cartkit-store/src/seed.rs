#![forbid(unsafe_code)]

//! Initial cart contents.

use std::fs;
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::item::Item;

/// The built-in seed list every new cart starts from.
#[must_use]
pub fn default_items() -> Vec<Item> {
    vec![
        Item::new(
            1,
            "Samsung Galaxy S7",
            599.99,
            "https://course-api.com/images/cart/phone-1.png",
        ),
        Item::new(
            2,
            "Google Pixel",
            499.99,
            "https://course-api.com/images/cart/phone-2.png",
        ),
        Item::new(
            3,
            "Xiaomi Redmi Note 2",
            699.99,
            "https://course-api.com/images/cart/phone-3.png",
        ),
    ]
}

/// Parse a JSON array of items.
pub fn parse_items(json: &str) -> Result<Vec<Item>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a JSON array of items from `path`.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let items = parse_items(&json)?;
    tracing::debug!(
        message = "seed.load",
        path = %path.display(),
        items = items.len()
    );
    Ok(items)
}
