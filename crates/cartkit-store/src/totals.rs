#![forbid(unsafe_code)]

//! Cart aggregates.
//!
//! The total is rounded to cents after *every* running addition, not once at
//! the end. For some inputs that gives a different result than rounding the
//! final sum; the per-step order is kept so totals stay identical to the
//! figures shoppers have already seen.

use crate::item::Item;

/// Round to two decimal places.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Number of units in the cart (sum of item amounts), saturating at the
/// `i64` bounds.
#[must_use]
pub fn cart_amount(items: &[Item]) -> i64 {
    items
        .iter()
        .fold(0i64, |sum, item| sum.saturating_add(item.amount))
}

/// Price of the cart: sum of `price * amount`, rounded to cents after each
/// addition.
#[must_use]
pub fn cart_total(items: &[Item]) -> f64 {
    items.iter().fold(0.0, |total, item| {
        round_cents(total + item.price * item.amount as f64)
    })
}
