//! The end-of-session JSON result report (§6): wraps the engine's
//! [`EngineReport`] with the run's identity, time bounds and parameters.

use crate::config::BacktestConfig;
use quantback_execution::EngineReport;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One backtest run's complete, serializable result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunReport {
    pub name: SmolStr,
    pub start: i64,
    pub end: i64,
    #[serde(flatten)]
    pub engine: EngineReport,
    pub parameters: BacktestConfig,
}

impl RunReport {
    pub fn new(name: impl Into<SmolStr>, start: i64, end: i64, engine: EngineReport, parameters: BacktestConfig) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            engine,
            parameters,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantback_execution::Account;
    use rust_decimal_macros::dec;

    #[test]
    fn report_serializes_to_json() {
        let account = Account::seed(1, dec!(10000), dec!(100), "USD", dec!(50));
        let engine_report = EngineReport {
            account_final: account,
            deals: Vec::new(),
            positions_closed: Vec::new(),
            orders: Vec::new(),
        };
        let report = RunReport::new("demo", 0, 100, engine_report, BacktestConfig::default());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"name\": \"demo\""));
        assert!(json.contains("\"account_final\""));
    }
}
