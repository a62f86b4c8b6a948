use crate::trade::{TradeDeal, TradeOrder, TradePosition};
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Keyed collection of trade entities (orders, deals, or positions) with
/// insertion-ordered iteration, mirroring the generic container described
/// for trade managers.
#[derive(Debug, Clone, Default)]
pub struct TradeManager<V> {
    entries: IndexMap<u64, V>,
}

impl<V> TradeManager<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, ticket: u64) -> Option<&V> {
        self.entries.get(&ticket)
    }

    pub fn set(&mut self, ticket: u64, value: V) {
        self.entries.insert(ticket, value);
    }

    pub fn update(&mut self, ticket: u64, f: impl FnOnce(&mut V)) -> bool {
        match self.entries.get_mut(&ticket) {
            Some(v) => {
                f(v);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, ticket: u64) -> Option<V> {
        self.entries.shift_remove(&ticket)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &u64> {
        self.entries.keys()
    }

    pub fn items(&self) -> impl Iterator<Item = (&u64, &V)> {
        self.entries.iter()
    }

    pub fn contains(&self, ticket: u64) -> bool {
        self.entries.contains_key(&ticket)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A snapshot copy of the full keyed collection, ticket to value.
    pub fn to_dict(&self) -> IndexMap<u64, V>
    where
        V: Clone,
    {
        self.entries.clone()
    }
}

/// Filter used by `*_get`/history-range lookups across the three trade
/// managers. `group` is a substring match against the symbol name (the
/// backtester's stand-in for a broker's wildcard symbol-group syntax);
/// `position` selects records belonging to one position ticket and only
/// applies to orders/deals, which carry a `position_id`.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub ticket: Option<u64>,
    pub symbol: Option<SmolStr>,
    pub group: Option<SmolStr>,
    pub position: Option<u64>,
}

impl TradeFilter {
    pub fn by_ticket(ticket: u64) -> Self {
        Self {
            ticket: Some(ticket),
            ..Default::default()
        }
    }

    pub fn by_symbol(symbol: impl Into<SmolStr>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    pub fn by_group(group: impl Into<SmolStr>) -> Self {
        Self {
            group: Some(group.into()),
            ..Default::default()
        }
    }

    pub fn by_position(position: u64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

/// Open positions plus the margin reserved against each. The invariant
/// `ticket ∈ open_positions iff ticket ∈ margin_map` is maintained solely by
/// [`Self::open`] and [`Self::close`].
#[derive(Debug, Clone, Default)]
pub struct PositionsManager {
    positions: TradeManager<TradePosition>,
    open_positions: IndexSet<u64>,
    margin_map: IndexMap<u64, Decimal>,
}

impl PositionsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticket: u64) -> Option<&TradePosition> {
        self.positions.get(ticket)
    }

    pub fn get_mut(&mut self, ticket: u64) -> Option<&mut TradePosition> {
        self.positions.entries.get_mut(&ticket)
    }

    pub fn all(&self) -> &TradeManager<TradePosition> {
        &self.positions
    }

    pub fn all_mut(&mut self) -> &mut TradeManager<TradePosition> {
        &mut self.positions
    }

    /// Opens a new position, reserving `margin` against it.
    pub fn open(&mut self, position: TradePosition, margin: Decimal) {
        let ticket = position.ticket;
        self.positions.set(ticket, position);
        self.open_positions.insert(ticket);
        self.margin_map.insert(ticket, margin);
    }

    /// Removes `ticket` from `open_positions` and `margin_map`; the position
    /// record itself remains in the manager so history can be reconstructed.
    pub fn close(&mut self, ticket: u64) -> Option<Decimal> {
        self.open_positions.shift_remove(&ticket);
        self.margin_map.shift_remove(&ticket)
    }

    pub fn open_positions_iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.open_positions.iter().copied()
    }

    pub fn positions_total(&self) -> usize {
        self.open_positions.len()
    }

    pub fn is_open(&self, ticket: u64) -> bool {
        self.open_positions.contains(&ticket)
    }

    pub fn margin(&self) -> Decimal {
        self.margin_map.values().sum()
    }

    pub fn margin_for(&self, ticket: u64) -> Option<Decimal> {
        self.margin_map.get(&ticket).copied()
    }

    pub fn positions_get(&self, filter: &TradeFilter) -> Vec<&TradePosition> {
        if let Some(ticket) = filter.ticket {
            return self.positions.get(ticket).into_iter().collect();
        }

        self.open_positions_iter()
            .filter_map(|ticket| self.positions.get(ticket))
            .filter(|p| filter.symbol.as_ref().is_none_or(|s| &p.symbol == s))
            .filter(|p| filter.group.as_ref().is_none_or(|g| p.symbol.contains(g.as_str())))
            .collect()
    }
}

/// Historical order records plus range queries over `time_done`.
#[derive(Debug, Clone, Default)]
pub struct OrdersManager {
    orders: TradeManager<TradeOrder>,
}

impl OrdersManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &TradeManager<TradeOrder> {
        &self.orders
    }

    pub fn inner_mut(&mut self) -> &mut TradeManager<TradeOrder> {
        &mut self.orders
    }

    pub fn get_orders_range(&self, from: i64, to: i64, filter: &TradeFilter) -> Vec<&TradeOrder> {
        self.orders
            .values()
            .filter(|o| o.time_done >= from && o.time_done < to)
            .filter(|o| filter.ticket.is_none_or(|t| o.ticket == t))
            .filter(|o| filter.symbol.as_ref().is_none_or(|s| &o.symbol == s))
            .filter(|o| filter.group.as_ref().is_none_or(|g| o.symbol.contains(g.as_str())))
            .filter(|o| filter.position.is_none_or(|p| o.position_id == p))
            .collect()
    }

    pub fn history_orders_total(&self, from: i64, to: i64, filter: &TradeFilter) -> usize {
        self.get_orders_range(from, to, filter).len()
    }
}

/// Historical deal records plus range queries over `time`.
#[derive(Debug, Clone, Default)]
pub struct DealsManager {
    deals: TradeManager<TradeDeal>,
}

impl DealsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &TradeManager<TradeDeal> {
        &self.deals
    }

    pub fn inner_mut(&mut self) -> &mut TradeManager<TradeDeal> {
        &mut self.deals
    }

    pub fn get_deals_range(&self, from: i64, to: i64, filter: &TradeFilter) -> Vec<&TradeDeal> {
        self.deals
            .values()
            .filter(|d| d.time >= from && d.time < to)
            .filter(|d| filter.ticket.is_none_or(|t| d.ticket == t))
            .filter(|d| filter.symbol.as_ref().is_none_or(|s| &d.symbol == s))
            .filter(|d| filter.group.as_ref().is_none_or(|g| d.symbol.contains(g.as_str())))
            .filter(|d| filter.position.is_none_or(|p| d.position_id == p))
            .collect()
    }

    pub fn history_deals_total(&self, from: i64, to: i64, filter: &TradeFilter) -> usize {
        self.get_deals_range(from, to, filter).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::Side;
    use rust_decimal_macros::dec;

    fn position(ticket: u64) -> TradePosition {
        TradePosition {
            ticket,
            symbol: "EURUSD".into(),
            side: Side::Buy,
            volume: dec!(0.1),
            price_open: dec!(1.1),
            price_current: dec!(1.1),
            sl: Decimal::ZERO,
            tp: Decimal::ZERO,
            profit: Decimal::ZERO,
            swap: Decimal::ZERO,
            time: 0,
            time_update: 0,
            magic: 0,
            comment: "".into(),
            identifier: ticket,
            reason: None,
        }
    }

    #[test]
    fn open_then_close_maintains_invariant() {
        let mut manager = PositionsManager::new();
        manager.open(position(1), dec!(110));

        assert!(manager.is_open(1));
        assert_eq!(manager.margin_for(1), Some(dec!(110)));
        assert_eq!(manager.positions_total(), 1);

        let released = manager.close(1);
        assert_eq!(released, Some(dec!(110)));
        assert!(!manager.is_open(1));
        assert_eq!(manager.margin_for(1), None);
        // history retained
        assert!(manager.get(1).is_some());
    }

    #[test]
    fn margin_sums_open_positions_only() {
        let mut manager = PositionsManager::new();
        manager.open(position(1), dec!(100));
        manager.open(position(2), dec!(50));
        assert_eq!(manager.margin(), dec!(150));

        manager.close(1);
        assert_eq!(manager.margin(), dec!(50));
    }

    #[test]
    fn positions_get_filters_by_group_substring() {
        let mut manager = PositionsManager::new();
        manager.open(position(1), dec!(100));
        let mut other = position(2);
        other.symbol = "GBPUSD".into();
        manager.open(other, dec!(50));

        let found = manager.positions_get(&TradeFilter::by_group("EUR"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticket, 1);
    }

    #[test]
    fn to_dict_snapshots_every_entry() {
        let mut manager: TradeManager<u64> = TradeManager::new();
        manager.set(1, 10);
        manager.set(2, 20);

        let dict = manager.to_dict();
        assert_eq!(dict.get(&1), Some(&10));
        assert_eq!(dict.get(&2), Some(&20));
        assert_eq!(dict.len(), 2);
    }

    fn order(ticket: u64, position_id: u64, symbol: &str) -> TradeOrder {
        TradeOrder {
            ticket,
            symbol: symbol.into(),
            side: Side::Buy,
            volume_initial: dec!(0.1),
            volume_current: dec!(0.1),
            price: dec!(1.1),
            sl: Decimal::ZERO,
            tp: Decimal::ZERO,
            time_setup: 0,
            time_done: 0,
            state: crate::trade::OrderState::Filled,
            magic: 0,
            comment: "".into(),
            position_id,
        }
    }

    #[test]
    fn get_orders_range_filters_by_position() {
        let mut manager = OrdersManager::new();
        manager.inner_mut().set(1, order(1, 100, "EURUSD"));
        manager.inner_mut().set(2, order(2, 200, "EURUSD"));

        let found = manager.get_orders_range(0, 10, &TradeFilter::by_position(100));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticket, 1);
        assert_eq!(manager.history_orders_total(0, 10, &TradeFilter::by_position(100)), 1);
    }
}
