use serde::{Deserialize, Serialize};

/// Canonical OHLCV bar duration. A closed enum: unknown timeframes are
/// rejected at the API boundary rather than derived from strings at call
/// time (per the engine's design notes).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Timeframe {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M10,
    M15,
    M20,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    /// Canonical duration in seconds, per spec §6.
    pub const fn duration_secs(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M2 => 120,
            Timeframe::M3 => 180,
            Timeframe::M4 => 240,
            Timeframe::M5 => 300,
            Timeframe::M6 => 360,
            Timeframe::M10 => 600,
            Timeframe::M15 => 900,
            Timeframe::M20 => 1200,
            Timeframe::M30 => 1800,
            Timeframe::H1 => 3600,
            Timeframe::H2 => 7200,
            Timeframe::H3 => 10800,
            Timeframe::H4 => 14400,
            Timeframe::H6 => 21600,
            Timeframe::H8 => 28800,
            Timeframe::D1 => 86400,
            Timeframe::W1 => 604800,
            Timeframe::MN1 => 2592000,
        }
    }

    pub const ALL: [Timeframe; 19] = [
        Timeframe::M1,
        Timeframe::M2,
        Timeframe::M3,
        Timeframe::M4,
        Timeframe::M5,
        Timeframe::M6,
        Timeframe::M10,
        Timeframe::M15,
        Timeframe::M20,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H3,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_match_spec_table() {
        assert_eq!(Timeframe::M1.duration_secs(), 60);
        assert_eq!(Timeframe::M30.duration_secs(), 1800);
        assert_eq!(Timeframe::H4.duration_secs(), 14400);
        assert_eq!(Timeframe::D1.duration_secs(), 86400);
        assert_eq!(Timeframe::W1.duration_secs(), 604800);
        assert_eq!(Timeframe::MN1.duration_secs(), 2592000);
    }

    #[test]
    fn all_contains_every_variant_once() {
        assert_eq!(Timeframe::ALL.len(), 19);
    }
}
