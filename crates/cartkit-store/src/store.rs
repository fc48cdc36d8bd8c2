#![forbid(unsafe_code)]

//! The cart store.
//!
//! [`CartStore`] owns an [`Observable<CartState>`] and two cells derived from
//! it: `amount` (units in the cart) and `total` (price of the cart). UI event
//! handlers call the mutation methods; renderers subscribe to the state or to
//! the derived cells and re-render on every notification.
//!
//! The store is a plain value. Create one per cart and pass it to whatever
//! needs it; nothing here is global.
//!
//! # Invariants
//!
//! 1. `amount` and `total` are recomputed from the whole cart on every
//!    change.
//! 2. Operations on an `id` that is not in the cart change nothing and
//!    notify nobody.
//! 3. `decrease_amount` does not stop at zero. Amounts saturate at the
//!    `i64` bounds.

use std::fmt;

use cartkit_runtime::reactive::{Derived, Observable, ReadOnly, Subscription, derived};

use crate::item::{CartState, Item, ItemId};
use crate::seed;
use crate::totals::{cart_amount, cart_total};

pub struct CartStore {
    state: Observable<CartState>,
    amount: Derived<i64>,
    total: Derived<f64>,
}

impl CartStore {
    /// Store holding `items`, in order.
    pub fn new(items: Vec<Item>) -> Self {
        let state = Observable::new(CartState::new(items));
        let amount = derived(&state, |s: &CartState| cart_amount(&s.cart));
        let total = derived(&state, |s: &CartState| cart_total(&s.cart));
        Self {
            state,
            amount,
            total,
        }
    }

    /// Store holding the built-in seed list.
    pub fn with_seed() -> Self {
        Self::new(seed::default_items())
    }

    /// Empty the cart.
    pub fn reset(&self) {
        tracing::debug!(message = "cart.reset");
        self.state.modify(|s| s.cart.clear());
    }

    /// Remove the first item with `id`. Returns whether one was removed.
    pub fn delete_item(&self, id: ItemId) -> bool {
        let Some(pos) = self.locate("cart.delete", id) else {
            return false;
        };
        self.state.modify(|s| {
            s.cart.remove(pos);
        });
        true
    }

    /// Add one unit of item `id`. Returns whether the item exists.
    pub fn increase_amount(&self, id: ItemId) -> bool {
        self.adjust("cart.increase", id, 1)
    }

    /// Remove one unit of item `id`; the amount may go below zero. Returns
    /// whether the item exists.
    pub fn decrease_amount(&self, id: ItemId) -> bool {
        self.adjust("cart.decrease", id, -1)
    }

    fn adjust(&self, op: &'static str, id: ItemId, delta: i64) -> bool {
        let Some(pos) = self.locate(op, id) else {
            return false;
        };
        self.state.modify(|s| {
            if let Some(item) = s.cart.get_mut(pos) {
                item.amount = item.amount.saturating_add(delta);
            }
        });
        true
    }

    fn locate(&self, op: &'static str, id: ItemId) -> Option<usize> {
        let pos = self.state.with(|s| s.position(id));
        tracing::debug!(message = op, id, matched = pos.is_some());
        pos
    }

    /// Read-only view of the cart state.
    #[must_use]
    pub fn state(&self) -> ReadOnly<CartState> {
        self.state.read_only()
    }

    /// Snapshot of the items.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.state.with(|s| s.cart.clone())
    }

    /// Units in the cart.
    #[must_use]
    pub fn amount(&self) -> &Derived<i64> {
        &self.amount
    }

    /// Price of the cart, in cents precision.
    #[must_use]
    pub fn total(&self) -> &Derived<f64> {
        &self.total
    }

    /// Subscribe to the cart state.
    pub fn subscribe(&self, on_change: impl FnMut(&CartState) + 'static) -> Subscription {
        self.state.subscribe(on_change)
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.state.with(|s| s.cart.len()))
            .field("subscribers", &self.state.subscriber_count())
            .finish()
    }
}
