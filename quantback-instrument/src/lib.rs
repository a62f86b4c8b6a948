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

//! Static instrument metadata for the quantback backtesting engine.
//!
//! Mirrors the "symbol info" surface of a MetaTrader-style broker API: every
//! instrument traded during a backtest has one [`SymbolInfo`] entry in a
//! [`SymbolCatalog`], used by the engine for margin/profit calculation and
//! order validation.

pub mod catalog;
pub mod symbol;
pub mod timeframe;

pub use catalog::SymbolCatalog;
pub use symbol::{CalcMode, SymbolInfo, TradeMode};
pub use timeframe::Timeframe;

use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SymbolError {
    #[error("symbol '{0}' is not present in the catalog")]
    Unknown(smol_str::SmolStr),

    #[error("symbol '{symbol}' has invalid {field}: {reason}")]
    InvalidConfig {
        symbol: smol_str::SmolStr,
        field: &'static str,
        reason: String,
    },
}
