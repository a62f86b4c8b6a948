use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Seed values the account ledger is created from (§3: "Account is created
/// from configured seed values").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountInfoConfig {
    pub login: u64,
    pub balance: Decimal,
    pub leverage: Decimal,
    pub currency: SmolStr,
    /// Stop-out threshold, a percentage of margin level (`margin_so_so`).
    pub margin_so_so: Decimal,
}

/// Every configurable option from §6's enumerated table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BacktestConfig {
    /// Seconds advanced per tick.
    pub speed: u32,
    pub start: i64,
    pub end: i64,
    /// Early-cut termination time; `None` means run to `end`.
    pub stop_time: Option<i64>,
    /// If false, resume from a loaded snapshot's cursor instead of index 0.
    pub restart: bool,
    /// Delegate margin/profit calc to the broker bridge by default.
    pub use_terminal: bool,
    /// Eagerly pull tick data per symbol before the session starts.
    pub preload: bool,
    /// Whether `wrap_up` closes every open position before reporting.
    pub close_open_positions_on_exit: bool,
    /// Register this engine as the process's active engine (§9: avoided as
    /// an ambient global here; kept only as a config flag a caller may act
    /// on, e.g. to choose which of several engines a strategy task binds to).
    pub assign_to_config: bool,
    pub account_info: AccountInfoConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            speed: 60,
            start: 0,
            end: 0,
            stop_time: None,
            restart: true,
            use_terminal: false,
            preload: false,
            close_open_positions_on_exit: true,
            assign_to_config: false,
            account_info: AccountInfoConfig {
                login: 0,
                balance: Decimal::ZERO,
                leverage: Decimal::ONE,
                currency: SmolStr::new("USD"),
                margin_so_so: Decimal::from(50),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = BacktestConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
