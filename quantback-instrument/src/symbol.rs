use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Direction a [`TradeMode`] permits for a symbol.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TradeMode {
    /// No trading allowed at all.
    Disabled,
    /// Only long (BUY) positions may be opened.
    LongOnly,
    /// Only short (SELL) positions may be opened.
    ShortOnly,
    /// Only closing existing positions is allowed, no new positions.
    CloseOnly,
    /// Both directions, open and close, are allowed.
    Full,
}

/// Selects the margin/profit formula family used for a symbol, following the
/// `trade_calc_mode` taxonomy from the MetaTrader5 lineage this engine's
/// broker-shaped interface is modelled on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum CalcMode {
    /// Standard forex instrument, margin divided by leverage.
    Forex,
    /// Forex instrument traded without a leverage divisor.
    ForexNoLeverage,
    /// Contract-for-difference, margin from contract size directly.
    Cfd,
    /// CFD on an index.
    CfdIndex,
    /// CFD with explicit leverage (distinct from standard forex leverage).
    CfdLeverage,
    /// Futures contract, margin and profit from tick value/size.
    Futures,
}

/// Static, read-only metadata for one tradable instrument.
///
/// Corresponds to the "symbol info" record a live broker terminal exposes;
/// loaded once per backtest session and never mutated.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub base_currency: SmolStr,
    pub quote_currency: SmolStr,
    pub margin_currency: SmolStr,
    /// Decimal places used when displaying/rounding prices for this symbol.
    pub digits: u32,
    /// Minimum price increment (a.k.a point / pip size).
    pub tick_size: Decimal,
    /// Monetary value of one `tick_size` move for one lot, in `margin_currency`.
    pub tick_value: Decimal,
    /// Units of the underlying represented by one lot.
    pub contract_size: Decimal,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
    pub volume_step: Decimal,
    pub trade_mode: TradeMode,
    pub calc_mode: CalcMode,
    /// Account leverage divisor applied for [`CalcMode::Forex`] margin calc.
    pub leverage: Decimal,
    /// Minimum distance (in price units) a SL/TP must sit from the current price.
    pub trade_stops_level: Decimal,
}

impl SymbolInfo {
    /// Rounds `volume` down to the nearest multiple of `volume_step` relative
    /// to `volume_min`, returning `None` if no valid multiple exists within
    /// `[volume_min, volume_max]`.
    pub fn is_volume_valid(&self, volume: Decimal) -> bool {
        if volume < self.volume_min || volume > self.volume_max {
            return false;
        }
        if self.volume_step.is_zero() {
            return true;
        }
        let steps = (volume - self.volume_min) / self.volume_step;
        (steps.round() - steps).abs() < Decimal::new(1, 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eurusd() -> SymbolInfo {
        SymbolInfo {
            name: "EURUSD".into(),
            base_currency: "EUR".into(),
            quote_currency: "USD".into(),
            margin_currency: "USD".into(),
            digits: 5,
            tick_size: dec!(0.00001),
            tick_value: dec!(1),
            contract_size: dec!(100000),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
            volume_step: dec!(0.01),
            trade_mode: TradeMode::Full,
            calc_mode: CalcMode::Forex,
            leverage: dec!(100),
            trade_stops_level: dec!(0.0010),
        }
    }

    #[test]
    fn volume_validation_accepts_exact_steps() {
        let info = eurusd();
        assert!(info.is_volume_valid(dec!(0.1)));
        assert!(info.is_volume_valid(dec!(1.00)));
        assert!(!info.is_volume_valid(dec!(0.015)));
        assert!(!info.is_volume_valid(dec!(0.001)));
        assert!(!info.is_volume_valid(dec!(1000)));
    }
}
