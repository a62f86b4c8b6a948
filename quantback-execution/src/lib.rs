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

//! Simulated broker for the quantback backtesting engine.
//!
//! Exposes a broker-shaped interface ([`engine::Engine`]) so strategy code
//! written against this simulator works unchanged against a live terminal:
//! read-only queries, `order_check`/`order_send`/`close_position`/
//! `modify_stops`, and the per-tick `tracker` maintenance routine described
//! in the engine design.

pub mod account;
pub mod bridge;
pub mod calc;
pub mod engine;
pub mod error;
pub mod manager;
pub mod retcode;
pub mod trade;

pub use account::Account;
pub use bridge::{BrokerBridge, NullBridge};
pub use calc::{calc_margin_local, convert_to_account_currency, order_calc_profit};
pub use engine::{
    Engine, EngineConfig, EngineReport, LedgerSnapshot, OrderCheckResult, OrderRequest, OrderSendResult,
    TerminalInfo,
};
pub use error::{AccountError, ExecutionError};
pub use manager::TradeFilter;
pub use retcode::RetCode;
pub use trade::{Side, TradeDeal, TradeOrder, TradePosition};
