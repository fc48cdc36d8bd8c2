#![forbid(unsafe_code)]

//! Command-line driver for cartkit stores.

pub mod cli;
pub mod error;
pub mod logging;
pub mod ops;
pub mod render;

pub use cli::run_from_env;
pub use error::{DemoError, Result};
