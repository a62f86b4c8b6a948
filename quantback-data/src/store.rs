use crate::{error::DataError, rates::{Bar, RateFrame}, ticks::{RawTick, TickFrame}};
use quantback_instrument::{SymbolCatalog, SymbolInfo, Timeframe};
use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::warn;

/// Holds loaded ticks/rates per symbol for one backtest session and answers
/// indexed and ranged lookups. Read-only once [`DataStore::finalize`] has
/// run; everything before that is the loading phase.
#[derive(Debug, Default)]
pub struct DataStore {
    catalog: SymbolCatalog,
    raw_ticks: HashMap<SmolStr, Vec<RawTick>>,
    ticks: HashMap<SmolStr, TickFrame>,
    rates: HashMap<(SmolStr, Timeframe), RateFrame>,
    span: Vec<i64>,
    range: Vec<i64>,
}

impl DataStore {
    pub fn new(catalog: SymbolCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn symbols(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn symbol_info(&self, symbol: &str) -> Result<&SymbolInfo, DataError> {
        Ok(self.catalog.get(symbol)?)
    }

    /// Stages raw ticks for `symbol`; call [`Self::finalize`] once every
    /// symbol of interest has been staged to build the reindexed views.
    pub fn load_ticks(&mut self, symbol: impl Into<SmolStr>, ticks: Vec<RawTick>) {
        self.raw_ticks.entry(symbol.into()).or_default().extend(ticks);
    }

    pub fn load_rates(&mut self, symbol: impl Into<SmolStr>, timeframe: Timeframe, bars: Vec<Bar>) {
        self.rates
            .insert((symbol.into(), timeframe), RateFrame::build(bars));
    }

    /// Builds `span` as every integer second in `[start, end)`, then
    /// reindexes every staged symbol's ticks onto it. `range` starts out
    /// equal to `span`; narrow it afterwards with [`Self::set_range`].
    ///
    /// Fails `data-missing` for any staged symbol with zero ticks.
    pub fn finalize(&mut self, start: i64, end: i64) -> Result<(), DataError> {
        self.span = (start..end).collect();

        for (symbol, raw) in self.raw_ticks.drain() {
            match TickFrame::build(raw, &self.span) {
                Some(frame) => {
                    self.ticks.insert(symbol, frame);
                }
                None => return Err(DataError::DataMissing(symbol)),
            }
        }

        self.range = self.span.clone();
        Ok(())
    }

    /// Trims the iterated sub-window. `from`/`to` are clamped into `span`;
    /// `len(range) <= len(span)` always holds.
    pub fn set_range(&mut self, from: i64, to: i64) -> Result<(), DataError> {
        let Some(&span_start) = self.span.first() else {
            return Err(DataError::TimeOutOfRange("span is empty".into()));
        };
        let span_end = *self.span.last().unwrap() + 1;

        if from < span_start || to > span_end || from > to {
            return Err(DataError::TimeOutOfRange(format!(
                "[{from}, {to}) is not within span [{span_start}, {span_end})"
            )));
        }

        self.range = (from..to).collect();
        Ok(())
    }

    pub fn span(&self) -> &[i64] {
        &self.span
    }

    pub fn range(&self) -> &[i64] {
        &self.range
    }

    /// Symbols with tick data loaded (a subset of the catalog — snapshot
    /// persistence iterates this, not the full catalog, since untouched
    /// symbols have nothing to save).
    pub fn tick_symbols(&self) -> impl Iterator<Item = &SmolStr> {
        self.ticks.keys()
    }

    /// `(symbol, timeframe)` pairs with rate data loaded.
    pub fn rate_keys(&self) -> impl Iterator<Item = &(SmolStr, Timeframe)> {
        self.rates.keys()
    }

    pub fn ticks(&self, symbol: &str) -> Result<&TickFrame, DataError> {
        self.ticks
            .get(symbol)
            .ok_or_else(|| DataError::DataMissing(SmolStr::new(symbol)))
    }

    pub fn prices(&self, symbol: &str) -> Result<&indexmap::IndexMap<i64, RawTick>, DataError> {
        Ok(self.ticks(symbol)?.prices())
    }

    pub fn price_at(&self, symbol: &str, time: i64) -> Result<RawTick, DataError> {
        self.ticks(symbol)?
            .price_at(time)
            .ok_or_else(|| DataError::NoTick {
                symbol: SmolStr::new(symbol),
                time,
            })
    }

    pub fn rates(&self, symbol: &str, timeframe: Timeframe) -> Result<&RateFrame, DataError> {
        self.rates
            .get(&(SmolStr::new(symbol), timeframe))
            .ok_or_else(|| DataError::RatesMissing {
                symbol: SmolStr::new(symbol),
                timeframe,
            })
    }

    pub fn copy_ticks_from(&self, symbol: &str, from: i64, count: usize) -> Result<Vec<RawTick>, DataError> {
        Ok(self.ticks(symbol)?.ticks_from(from, count))
    }

    pub fn copy_ticks_range(&self, symbol: &str, from: i64, to: i64) -> Result<Vec<RawTick>, DataError> {
        Ok(self.ticks(symbol)?.ticks_range(from, to))
    }

    pub fn copy_rates_from(&self, symbol: &str, timeframe: Timeframe, from: i64, count: usize) -> Result<Vec<Bar>, DataError> {
        Ok(self.rates(symbol, timeframe)?.from(from, count))
    }

    pub fn copy_rates_from_pos(&self, symbol: &str, timeframe: Timeframe, start_pos: usize, count: usize) -> Result<Vec<Bar>, DataError> {
        Ok(self.rates(symbol, timeframe)?.from_pos(start_pos, count))
    }

    pub fn copy_rates_range(&self, symbol: &str, timeframe: Timeframe, from: i64, to: i64) -> Result<Vec<Bar>, DataError> {
        Ok(self.rates(symbol, timeframe)?.range(from, to))
    }

    /// Eagerly pulls tick data for every catalog symbol (`preload` config
    /// option); a no-op placeholder here since this core has no external
    /// data source wired in (out of scope, §1) — real loaders call
    /// [`Self::load_ticks`] directly before [`Self::finalize`].
    pub fn preload_all(&self) {
        for name in self.catalog.names() {
            if !self.raw_ticks.contains_key(name) && !self.ticks.contains_key(name) {
                warn!(symbol = %name, "preload requested but no ticks staged");
            }
        }
    }
}
