use serde::{Deserialize, Serialize};

/// Result code for `order_check`/`order_send`. The first failing validation
/// in the §4.5.3 ordering decides the result; `Done` means the request is
/// (or would be) filled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum RetCode {
    Done,

    // Validation errors
    Invalid,
    InvalidVolume,
    InvalidPrice,
    InvalidStops,
    InvalidFill,
    InvalidExpiration,
    InvalidOrder,
    InvalidCloseVolume,

    // Market-state errors
    MarketClosed,
    PriceChanged,
    PriceOff,
    Requote,
    TradeDisabled,
    LongOnly,
    ShortOnly,
    CloseOnly,

    // Account errors
    NoMoney,
    LimitOrders,
    LimitVolume,
    LimitPositions,

    // State errors
    PositionClosed,
    OrderChanged,
    NoChanges,
    Locked,
    Frozen,
}

impl RetCode {
    pub fn is_done(self) -> bool {
        matches!(self, RetCode::Done)
    }
}
