#![forbid(unsafe_code)]

//! Cart line items and the cart state they live in.

use cartkit_runtime::reactive::SafeEq;
use serde::{Deserialize, Serialize};

/// Identifier of an item, unique within one cart.
pub type ItemId = u32;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    /// Unit price, never negative.
    pub price: f64,
    /// Image URI.
    pub img: String,
    /// Quantity. Signed: decrementing does not stop at zero.
    #[serde(default = "default_amount")]
    pub amount: i64,
}

fn default_amount() -> i64 {
    1
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>, price: f64, img: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            img: img.into(),
            amount: default_amount(),
        }
    }

    #[must_use]
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = amount;
        self
    }
}

/// Contents of a cart, in insertion order.
///
/// No two items are expected to share an `id`; nothing enforces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    pub cart: Vec<Item>,
}

impl CartState {
    pub fn new(cart: Vec<Item>) -> Self {
        Self { cart }
    }

    /// Index of the first item with `id`.
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.cart.iter().position(|item| item.id == id)
    }

    #[must_use]
    pub fn find(&self, id: ItemId) -> Option<&Item> {
        self.cart.iter().find(|item| item.id == id)
    }
}

// Every write of the cart counts as a change, matching in-place mutation.
impl SafeEq for CartState {}
