#![forbid(unsafe_code)]

//! cartkit public facade crate.
//!
//! Reactive cells from `cartkit-runtime` and, with the `store` feature, the
//! shopping-cart store built on them.

pub use cartkit_runtime::reactive::{
    Derived, Observable, ReadOnly, Readable, SafeEq, Setter, Subscriber, Subscription, derived,
    derived_all, derived_all_with, derived_with, derived2, derived2_with, derived3, readable,
    subscribe_to,
};
pub use cartkit_runtime::{ReactiveError, Result};

#[cfg(feature = "store")]
pub use cartkit_store::{CartState, CartStore, Item, ItemId, StoreError};

pub mod prelude {
    pub use cartkit_runtime as runtime;
    #[cfg(feature = "store")]
    pub use cartkit_store as store;

    pub use cartkit_runtime::reactive::{Derived, Observable, Readable, Subscription};
    #[cfg(feature = "store")]
    pub use cartkit_store::{CartStore, Item};
}
