use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV aggregate over a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bar {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub tick_volume: Decimal,
    pub real_volume: Decimal,
    pub spread: u32,
}

/// An ordered sequence of bars for one symbol/timeframe, indexed by bar open
/// time.
#[derive(Debug, Clone, Default)]
pub struct RateFrame {
    bars: IndexMap<i64, Bar>,
}

impl RateFrame {
    pub fn build(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.time);
        Self {
            bars: bars.into_iter().map(|b| (b.time, b)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, time: i64) -> Option<&Bar> {
        self.bars.get(&time)
    }

    /// `count` bars with `time >= from`, earliest first.
    pub fn from(&self, from: i64, count: usize) -> Vec<Bar> {
        self.bars
            .values()
            .filter(|b| b.time >= from)
            .take(count)
            .copied()
            .collect()
    }

    /// `count` bars counting back `start_pos` bars from the most recent,
    /// mirroring `copy_rates_from_pos`: `start_pos = 0` is the latest bar.
    pub fn from_pos(&self, start_pos: usize, count: usize) -> Vec<Bar> {
        let len = self.bars.len();
        if start_pos >= len {
            return Vec::new();
        }
        let end = len - start_pos;
        let start = end.saturating_sub(count);
        self.bars.values().skip(start).take(end - start).copied().collect()
    }

    /// Every bar, earliest first.
    pub fn all(&self) -> Vec<Bar> {
        self.bars.values().copied().collect()
    }

    pub fn range(&self, from: i64, to: i64) -> Vec<Bar> {
        self.bars
            .values()
            .filter(|b| b.time >= from && b.time < to)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(time: i64) -> Bar {
        Bar {
            time,
            open: dec!(1),
            high: dec!(1.1),
            low: dec!(0.9),
            close: dec!(1.05),
            tick_volume: dec!(100),
            real_volume: dec!(0),
            spread: 2,
        }
    }

    #[test]
    fn from_pos_zero_is_latest_bar() {
        let frame = RateFrame::build(vec![bar(0), bar(60), bar(120)]);
        let latest = frame.from_pos(0, 1);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].time, 120);
    }

    #[test]
    fn from_pos_counts_back_from_latest() {
        let frame = RateFrame::build(vec![bar(0), bar(60), bar(120)]);
        let got = frame.from_pos(1, 2);
        assert_eq!(got.iter().map(|b| b.time).collect::<Vec<_>>(), vec![0, 60]);
    }

    #[test]
    fn range_is_half_open() {
        let frame = RateFrame::build(vec![bar(0), bar(60), bar(120)]);
        let got = frame.range(0, 120);
        assert_eq!(got.len(), 2);
    }
}
