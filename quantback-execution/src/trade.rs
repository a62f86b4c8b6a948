use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Why a closing deal was generated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum CloseReason {
    /// Closed by an explicit `close_position` call from a strategy.
    Manual,
    /// Closed because the stop-loss price was hit.
    StopLoss,
    /// Closed because the take-profit price was hit.
    TakeProfit,
}

/// Whether a deal opened, closed, or reversed a position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum DealEntry {
    In,
    Out,
    InOut,
    OutBy,
}

/// Terminal state of a [`TradeOrder`]. This engine only ever produces
/// `Filled` orders (market orders, filled immediately) per the Non-goals in
/// §1 (no pending order lifecycle).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderState {
    Filled,
}

/// The request-side record of an `order_send` call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeOrder {
    pub ticket: u64,
    pub symbol: SmolStr,
    pub side: Side,
    pub volume_initial: Decimal,
    pub volume_current: Decimal,
    pub price: Decimal,
    pub sl: Decimal,
    pub tp: Decimal,
    pub time_setup: i64,
    pub time_done: i64,
    pub state: OrderState,
    pub magic: u64,
    pub comment: SmolStr,
    pub position_id: u64,
}

/// The fill-side record of an `order_send`/`close_position` call. One `In`
/// deal is produced on open, one `Out` deal on close.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeDeal {
    pub ticket: u64,
    pub order: u64,
    pub position_id: u64,
    pub symbol: SmolStr,
    pub side: Side,
    pub entry: DealEntry,
    pub volume: Decimal,
    pub price: Decimal,
    pub profit: Decimal,
    pub commission: Decimal,
    pub swap: Decimal,
    pub time: i64,
    pub magic: u64,
    pub reason: CloseReason,
}

/// An open net exposure resulting from an `order_send`. Moved conceptually
/// to history on close (the record itself remains in
/// [`crate::manager::PositionsManager`] so history can be reconstructed;
/// only its ticket leaves `open_positions`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradePosition {
    pub ticket: u64,
    pub symbol: SmolStr,
    pub side: Side,
    pub volume: Decimal,
    pub price_open: Decimal,
    pub price_current: Decimal,
    pub sl: Decimal,
    pub tp: Decimal,
    pub profit: Decimal,
    pub swap: Decimal,
    pub time: i64,
    pub time_update: i64,
    pub magic: u64,
    pub comment: SmolStr,
    pub identifier: u64,
    pub reason: Option<CloseReason>,
}
