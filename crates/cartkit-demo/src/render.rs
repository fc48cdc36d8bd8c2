#![forbid(unsafe_code)]

//! Renderers for cart snapshots.
//!
//! [`LiveView`] subscribes to a store and records a [`Snapshot`] on every
//! state notification. Snapshots are turned into text or JSON lines
//! afterwards, so a failing writer never runs inside a notification.

use std::cell::RefCell;
use std::rc::Rc;

use cartkit_runtime::reactive::Subscription;
use cartkit_store::{CartStore, Item};
use serde::Serialize;

use crate::error::Result;

/// What a renderer saw after one notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub cart: Vec<Item>,
    pub amount: i64,
    pub total: f64,
}

impl Snapshot {
    pub fn of(store: &CartStore) -> Self {
        Self {
            cart: store.items(),
            amount: store.amount().get(),
            total: store.total().get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Records a snapshot per state notification while alive.
pub struct LiveView {
    snapshots: Rc<RefCell<Vec<Snapshot>>>,
    // Order matters: the aggregates must be live before the state
    // subscription so they are fresh when it fires.
    _amount: Subscription,
    _total: Subscription,
    _state: Subscription,
}

impl LiveView {
    pub fn attach(store: &CartStore) -> Self {
        let amount = store.amount().clone();
        let total = store.total().clone();
        let _amount = amount.subscribe(|_| {});
        let _total = total.subscribe(|_| {});

        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&snapshots);
        let _state = store.subscribe(move |state| {
            let snapshot = Snapshot {
                cart: state.cart.clone(),
                amount: amount.with(|v| *v),
                total: total.with(|v| *v),
            };
            tracing::trace!(
                message = "view.frame",
                items = snapshot.cart.len(),
                amount = snapshot.amount
            );
            sink.borrow_mut().push(snapshot);
        });

        Self {
            snapshots,
            _amount,
            _total,
            _state,
        }
    }

    /// Snapshots recorded so far, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.borrow().clone()
    }
}

pub fn render(format: Format, snapshot: &Snapshot) -> Result<String> {
    match format {
        Format::Text => Ok(render_text(snapshot)),
        Format::Json => Ok(serde_json::to_string(snapshot)?),
    }
}

pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if snapshot.cart.is_empty() {
        out.push_str("  (cart is empty)\n");
    }
    let width = snapshot
        .cart
        .iter()
        .map(|item| item.title.chars().count())
        .max()
        .unwrap_or(0);
    for item in &snapshot.cart {
        let price = format!("${:.2}", item.price);
        out.push_str(&format!(
            "  #{:<3} {:<width$}  {:>10}  x{}\n",
            item.id, item.title, price, item.amount,
        ));
    }
    out.push_str(&format!(
        "items: {}  total: ${:.2}",
        snapshot.amount, snapshot.total
    ));
    out
}
