use smol_str::SmolStr;
use thiserror::Error;

/// Internal data-store failures. Per the engine's error design, these never
/// propagate to strategies as exceptions: they surface as structured results
/// from the [`Engine`](quantback_execution)'s read-only queries.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("data-missing: symbol '{0}' has no ticks covering the test span")]
    DataMissing(SmolStr),

    #[error("rates-missing: symbol '{symbol}' has no {timeframe:?} rate frame loaded")]
    RatesMissing {
        symbol: SmolStr,
        timeframe: quantback_instrument::Timeframe,
    },

    #[error("no-tick: symbol '{symbol}' has no price at time {time}")]
    NoTick { symbol: SmolStr, time: i64 },

    #[error("time-out-of-range: {0}")]
    TimeOutOfRange(String),

    #[error(transparent)]
    Symbol(#[from] quantback_instrument::SymbolError),
}
