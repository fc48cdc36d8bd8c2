#![forbid(unsafe_code)]

//! Runtime: reactive cells and change propagation for cartkit stores.

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
