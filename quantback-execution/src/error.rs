use smol_str::SmolStr;
use thiserror::Error;

/// Account-ledger failures. Per the engine's error design, these are
/// structured results, not panics: `insufficient-balance` and
/// `currency-cross-unavailable` are named directly in spec §7.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AccountError {
    #[error("insufficient-balance: withdrawal of {requested} exceeds balance {balance}")]
    InsufficientBalance {
        requested: rust_decimal::Decimal,
        balance: rust_decimal::Decimal,
    },

    #[error(
        "currency-cross-unavailable: no tick for a cross rate between '{from}' and '{to}'"
    )]
    CurrencyCrossUnavailable { from: SmolStr, to: SmolStr },

    #[error("bridge-unavailable: no broker bridge is configured")]
    BridgeUnavailable,
}

/// Top-level execution-crate error, aggregating the data store and account
/// failure domains for callers that need a single error type (eg/
/// `order_calc_margin`/`order_calc_profit`, which can fail for either
/// reason).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Data(#[from] quantback_data::DataError),
}
