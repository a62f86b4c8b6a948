use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price update for a symbol at a specific time.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RawTick {
    pub time: i64,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub volume: Decimal,
    pub time_msc: i64,
    pub flags: u32,
}

impl RawTick {
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Per-symbol tick storage: the ticks exactly as supplied (`raw`), plus a
/// reindexed view with exactly one row per second of the test span
/// (`prices`), built by [`reindex_to_seconds`].
#[derive(Debug, Clone)]
pub struct TickFrame {
    raw: Vec<RawTick>,
    prices: IndexMap<i64, RawTick>,
}

impl TickFrame {
    /// Builds a `TickFrame` from unsorted raw ticks, reindexing onto every
    /// second in `span`. Returns `None` if `raw` is empty (the caller should
    /// surface this as [`crate::DataError::DataMissing`]).
    pub fn build(mut raw: Vec<RawTick>, span: &[i64]) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        raw.sort_by_key(|t| t.time);
        let prices = reindex_to_seconds(&raw, span);
        Some(Self { raw, prices })
    }

    pub fn raw(&self) -> &[RawTick] {
        &self.raw
    }

    pub fn prices(&self) -> &IndexMap<i64, RawTick> {
        &self.prices
    }

    pub fn price_at(&self, time: i64) -> Option<RawTick> {
        self.prices.get(&time).copied()
    }

    /// `count` raw ticks with `time >= from`, in ascending time order.
    pub fn ticks_from(&self, from: i64, count: usize) -> Vec<RawTick> {
        let start = self.raw.partition_point(|t| t.time < from);
        self.raw
            .iter()
            .skip(start)
            .take(count)
            .copied()
            .collect()
    }

    /// Raw ticks with `from <= time < to`.
    pub fn ticks_range(&self, from: i64, to: i64) -> Vec<RawTick> {
        let start = self.raw.partition_point(|t| t.time < from);
        let end = self.raw.partition_point(|t| t.time < to);
        self.raw[start..end].to_vec()
    }
}

/// Reindex-to-seconds: for every integer second `t` in `span`, assign the
/// raw tick whose time is the nearest `<= t`, or if none precedes `t`, the
/// first tick (nearest neighbor forward). `raw` must already be sorted
/// ascending by `time`. Guarantees a row for every `t` in `span` provided
/// `raw` is non-empty.
pub fn reindex_to_seconds(raw: &[RawTick], span: &[i64]) -> IndexMap<i64, RawTick> {
    let mut out = IndexMap::with_capacity(span.len());
    let mut cursor = 0usize;
    let mut last_seen: Option<RawTick> = None;

    for &t in span {
        while cursor < raw.len() && raw[cursor].time <= t {
            last_seen = Some(raw[cursor]);
            cursor += 1;
        }
        let assigned = last_seen.unwrap_or(raw[0]);
        out.insert(t, assigned);
    }

    out
}
