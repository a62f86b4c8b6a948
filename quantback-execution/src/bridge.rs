use crate::{error::AccountError, trade::Side};
use quantback_instrument::SymbolInfo;
use rust_decimal::Decimal;
use std::fmt::Debug;

/// Pass-through to a real broker terminal for margin/profit/symbol-info,
/// selected per-call or by default via `use_terminal` (§6, §9). No concrete
/// implementation ships in this core — the live broker adapter is an
/// external collaborator (§1) — only the trait boundary and a stand-in for
/// tests.
pub trait BrokerBridge: Debug + Send + Sync {
    fn order_calc_margin(
        &self,
        side: Side,
        symbol: &str,
        volume: Decimal,
        price: Decimal,
    ) -> Result<Decimal, AccountError>;

    fn order_calc_profit(
        &self,
        side: Side,
        symbol: &str,
        volume: Decimal,
        price_open: Decimal,
        price_close: Decimal,
    ) -> Result<Decimal, AccountError>;

    fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo>;
}

/// Stand-in bridge used when no live terminal is configured; every call
/// fails `bridge-unavailable` so tests can force local compute
/// deterministically.
#[derive(Debug, Default)]
pub struct NullBridge;

impl BrokerBridge for NullBridge {
    fn order_calc_margin(
        &self,
        _side: Side,
        _symbol: &str,
        _volume: Decimal,
        _price: Decimal,
    ) -> Result<Decimal, AccountError> {
        Err(AccountError::BridgeUnavailable)
    }

    fn order_calc_profit(
        &self,
        _side: Side,
        _symbol: &str,
        _volume: Decimal,
        _price_open: Decimal,
        _price_close: Decimal,
    ) -> Result<Decimal, AccountError> {
        Err(AccountError::BridgeUnavailable)
    }

    fn symbol_info(&self, _symbol: &str) -> Option<SymbolInfo> {
        None
    }
}
