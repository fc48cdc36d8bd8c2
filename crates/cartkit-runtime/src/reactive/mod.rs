#![forbid(unsafe_code)]

//! Reactive cells for cartkit stores.
//!
//! This module provides the change-propagation primitives a store is built
//! from:
//!
//! - [`Observable`]: a shared value with synchronous change notification and
//!   optional start/stop lifecycle hooks.
//! - [`Subscriber`] / [`Subscription`]: the callback pair registered against a
//!   cell, and the guard that removes it again (explicitly or on drop).
//! - [`Derived`]: a read-only cell whose value is computed from one or more
//!   sources and republished whenever they change.
//! - [`SafeEq`]: the "observably different" test deciding whether a `set`
//!   is an effective change.
//!
//! # Architecture
//!
//! Cells use `Rc` + `RefCell` for single-threaded shared ownership. All
//! notifications on a thread go through one FIFO queue guarded by an
//! in-flight flag (see `scheduler`): a `set` made while another notification
//! is being delivered is appended to the tail and replayed once the current
//! cycle finishes, so no subscriber callback is ever re-entered.
//!
//! Derived cells start lazily. The first subscriber subscribes the cell to
//! its sources; the last unsubscribe releases them.
//!
//! # Invariants
//!
//! 1. `subscribe` delivers the current value exactly once before returning.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value that is not observably different is a no-op (no
//!    invalidation, no delivery).
//! 4. Every `on_invalidate` of a change runs before any `on_change` of it.
//! 5. A derived cell never recomputes while any of its sources is
//!    invalidated but not yet re-delivered.

pub mod derived;
pub mod equality;
pub mod observable;
mod pending;
mod scheduler;

pub use derived::{
    Derived, derived, derived_all, derived_all_with, derived_with, derived2, derived2_with,
    derived3,
};
pub use equality::{SafeEq, safe_not_equal};
pub use observable::{
    Cleanup, Observable, ReadOnly, Readable, Setter, StopHook, Subscriber, Subscription, readable,
    subscribe_to,
};
