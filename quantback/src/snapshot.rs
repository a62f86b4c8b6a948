//! Save/resume support (§6, §8 scenario 5): captures every piece of state a
//! session needs to continue elsewhere — the cursor, the loaded market data,
//! and the full ledger — as one serde-friendly value.

use crate::cursor::{Clock, Cursor};
use quantback_data::{Bar, DataStore, RawTick};
use quantback_execution::{Engine, LedgerSnapshot};
use quantback_instrument::{SymbolInfo, Timeframe};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;

/// The full on-disk representation of a paused backtest session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackTestData {
    pub name: SmolStr,
    pub version: SmolStr,
    pub symbols: HashMap<SmolStr, SymbolInfo>,
    pub ticks: HashMap<SmolStr, Vec<RawTick>>,
    pub rates: HashMap<SmolStr, HashMap<Timeframe, Vec<Bar>>>,
    pub span: Vec<i64>,
    pub range: Vec<i64>,
    pub cursor: Cursor,
    pub ledger: LedgerSnapshot,
    /// Whether `preload` had already pulled every symbol's data when this
    /// snapshot was taken; a resumed session with `restart: false` skips
    /// preloading again if this is `true`.
    pub fully_loaded: bool,
}

impl BackTestData {
    /// Captures the current state of `data`, `engine` and `clock` under
    /// `name`. Does not touch `engine`/`clock` — this is a read, not a pause.
    pub fn capture(name: impl Into<SmolStr>, data: &DataStore, engine: &Engine, clock: &Clock, fully_loaded: bool) -> Self {
        let symbols = data.symbols().iter().map(|(n, info)| (n.clone(), info.clone())).collect();

        let ticks = data
            .tick_symbols()
            .map(|symbol| {
                let rows = data.ticks(symbol).map(|frame| frame.raw().to_vec()).unwrap_or_default();
                (symbol.clone(), rows)
            })
            .collect();

        let mut rates: HashMap<SmolStr, HashMap<Timeframe, Vec<Bar>>> = HashMap::new();
        for (symbol, timeframe) in data.rate_keys() {
            let bars = data.rates(symbol, *timeframe).map(|frame| frame.all()).unwrap_or_default();
            rates.entry(symbol.clone()).or_default().insert(*timeframe, bars);
        }

        Self {
            name: name.into(),
            version: SmolStr::new(engine.get_version()),
            symbols,
            ticks,
            rates,
            span: data.span().to_vec(),
            range: data.range().to_vec(),
            cursor: clock.current(),
            ledger: engine.export_ledger(),
            fully_loaded,
        }
    }

    /// Rebuilds the `(DataStore, Clock)` pair this snapshot was captured
    /// from. The returned `DataStore` is finalized against `span`; `range` is
    /// reapplied with [`DataStore::set_range`]. Call [`Engine::import_ledger`]
    /// separately with `self.ledger` once the new `Engine` exists, since an
    /// `Engine` needs a `DataStore` to construct.
    pub fn rebuild_data_and_clock(&self, step: usize) -> Result<(DataStore, Clock), quantback_data::DataError> {
        let mut catalog = quantback_instrument::SymbolCatalog::new();
        for info in self.symbols.values() {
            catalog.insert(info.clone())?;
        }

        let mut store = DataStore::new(catalog);
        for (symbol, rows) in &self.ticks {
            store.load_ticks(symbol.clone(), rows.clone());
        }
        let start = self.span.first().copied().unwrap_or(0);
        let end_exclusive = self.span.last().copied().unwrap_or(0);
        store.finalize(start, end_exclusive + 1)?;
        if let (Some(&from), Some(&to)) = (self.range.first(), self.range.last()) {
            store.set_range(from, to + 1)?;
        }
        for (symbol, by_timeframe) in &self.rates {
            for (timeframe, bars) in by_timeframe {
                store.load_rates(symbol.clone(), *timeframe, bars.clone());
            }
        }

        let mut clock = Clock::new(self.range.clone(), step);
        clock.go_to(self.cursor.time).map_err(|_| {
            quantback_data::DataError::TimeOutOfRange(format!(
                "snapshot cursor time {} is not within the rebuilt range",
                self.cursor.time
            ))
        })?;

        Ok((store, clock))
    }
}

/// Convenience wrapper pairing a rebuilt `Engine` with the `DataStore`/`Clock`
/// it was constructed from, for callers that want everything back in one
/// call after [`BackTestData::rebuild_data_and_clock`].
pub fn resume(
    snapshot: &BackTestData,
    config: quantback_execution::EngineConfig,
    broker_bridge: Option<Arc<dyn quantback_execution::BrokerBridge>>,
    step: usize,
) -> Result<(Arc<Engine>, Arc<DataStore>, Clock), quantback_data::DataError> {
    let (store, clock) = snapshot.rebuild_data_and_clock(step)?;
    let data = Arc::new(store);
    let account = snapshot.ledger.account.clone();
    let engine = Engine::new(data.clone(), account, config, broker_bridge);
    engine.import_ledger(snapshot.ledger.clone());
    Ok((Arc::new(engine), data, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantback_execution::{Account, EngineConfig};
    use quantback_instrument::symbol::{CalcMode, TradeMode};
    use quantback_instrument::SymbolCatalog;
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

    fn tick(time: i64) -> RawTick {
        RawTick {
            time,
            bid: dec!(1.1000),
            ask: dec!(1.1002),
            last: dec!(1.1000),
            volume: dec!(1),
            time_msc: time * 1000,
            flags: 0,
        }
    }

    fn engine_and_clock() -> (Arc<DataStore>, Engine, Clock) {
        let mut catalog = SymbolCatalog::new();
        catalog.insert(eurusd()).unwrap();
        let mut store = DataStore::new(catalog);
        store.load_ticks("EURUSD", (0..10).map(tick).collect());
        store.finalize(0, 10).unwrap();
        let account = Account::seed(1, dec!(10000), dec!(100), "USD", dec!(50));
        let data = Arc::new(store);
        let engine = Engine::new(data.clone(), account, EngineConfig::default(), None);
        let clock = Clock::new(data.range().to_vec(), 1);
        (data, engine, clock)
    }

    #[test]
    fn capture_then_rebuild_round_trips_span_range_and_cursor() {
        let (data, engine, mut clock) = engine_and_clock();
        clock.next();
        clock.next();
        engine.set_time(clock.current().time);

        let snapshot = BackTestData::capture("session-a", &data, &engine, &clock, false);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: BackTestData = serde_json::from_str(&json).unwrap();

        let (store, rebuilt_clock) = restored.rebuild_data_and_clock(1).unwrap();
        assert_eq!(store.span(), data.span());
        assert_eq!(store.range(), data.range());
        assert_eq!(rebuilt_clock.current(), clock.current());
    }

    #[test]
    fn resume_restores_account_balance() {
        let (data, engine, clock) = engine_and_clock();
        engine.get_account_info();
        let snapshot = BackTestData::capture("session-b", &data, &engine, &clock, false);

        let (resumed, _data, resumed_clock) = resume(&snapshot, EngineConfig::default(), None, 1).unwrap();
        assert_eq!(resumed.get_account_info().balance, dec!(10000));
        assert_eq!(resumed_clock.current(), clock.current());
    }
}
