#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! Read-only tick/rate storage for one backtest session.
//!
//! Ticks and rates are loaded up front (or lazily per symbol) and are
//! immutable thereafter; the store's job is to answer indexed and ranged
//! lookups for the [`Engine`](quantback_execution) and, through it, for
//! strategies.

pub mod error;
pub mod rates;
pub mod store;
pub mod ticks;

pub use error::DataError;
pub use rates::{Bar, RateFrame};
pub use store::DataStore;
pub use ticks::{RawTick, TickFrame};
