#![forbid(unsafe_code)]

//! Cart store: items, cart mutations, and the derived item count and total.

pub mod error;
pub mod item;
pub mod seed;
pub mod store;
pub mod totals;

pub use error::{Result, StoreError};
pub use item::{CartState, Item, ItemId};
pub use store::CartStore;
pub use totals::{cart_amount, cart_total, round_cents};
