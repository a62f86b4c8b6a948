//! The simulated broker. Exposes the same operation set a live terminal
//! would (§4.5): read-only queries, `order_check`/`order_send`/
//! `close_position`/`modify_stops`, and the per-tick `tracker` maintenance
//! routine the controller drives.

use crate::{
    account::{apply_account_update, Account, AccountLedger, LedgerState},
    bridge::BrokerBridge,
    calc,
    error::{AccountError, ExecutionError},
    manager::TradeFilter,
    retcode::RetCode,
    trade::{CloseReason, DealEntry, OrderState, Side, TradeDeal, TradeOrder, TradePosition},
};
use quantback_data::{Bar, DataStore, RawTick};
use quantback_instrument::{symbol::TradeMode, SymbolInfo, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc,
};
use tracing::{info, warn};

/// Minimal terminal identity (`get_terminal_info`); no connection/licensing
/// detail, since the live broker adapter is an external collaborator (§1).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TerminalInfo {
    pub name: SmolStr,
    pub connected: bool,
    pub trade_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRequest {
    pub symbol: SmolStr,
    pub side: Side,
    pub volume: Decimal,
    pub price: Decimal,
    /// Maximum acceptable deviation from the current bid/ask, in price units.
    pub deviation: Decimal,
    pub sl: Decimal,
    pub tp: Decimal,
    pub magic: u64,
    pub comment: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderCheckResult {
    pub retcode: RetCode,
    pub balance: Decimal,
    pub equity: Decimal,
    pub profit: Decimal,
    pub margin: Decimal,
    pub margin_free: Decimal,
    pub margin_level: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderSendResult {
    pub retcode: RetCode,
    pub order: u64,
    pub deal: u64,
    pub volume: Decimal,
    pub price: Decimal,
}

/// The engine-level slice of the `wrap_up` result report (§6); `quantback`
/// wraps this with the session name, time bounds and run parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineReport {
    pub account_final: Account,
    pub deals: Vec<TradeDeal>,
    pub positions_closed: Vec<TradePosition>,
    pub orders: Vec<TradeOrder>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Delegate margin/profit calc to the broker bridge by default
    /// (overridable per-call per §9's "delegation vs. local compute").
    pub use_terminal: bool,
    pub terminal_name: SmolStr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_terminal: false,
            terminal_name: SmolStr::new("quantback"),
        }
    }
}

/// Complete ledger contents for snapshot persistence, independent of the
/// data-layer span/range and the cursor (`quantback::snapshot` composes all
/// three).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LedgerSnapshot {
    pub account: Account,
    pub orders: std::collections::HashMap<u64, TradeOrder>,
    pub deals: std::collections::HashMap<u64, TradeDeal>,
    pub positions: std::collections::HashMap<u64, TradePosition>,
    pub open_positions: Vec<u64>,
    pub margins: std::collections::HashMap<u64, Decimal>,
}

/// A request that has cleared every §4.5.3 check; carries the values
/// `order_send` needs so it doesn't recompute them.
struct ValidatedOrder {
    info: SymbolInfo,
    price: Decimal,
    margin: Decimal,
}

/// The simulated broker. One `Engine` per backtest session; shared across
/// strategy tasks behind an `Arc` (its own state is internally synchronized).
#[derive(Debug)]
pub struct Engine {
    data: Arc<DataStore>,
    ledger: AccountLedger,
    broker_bridge: Option<Arc<dyn BrokerBridge>>,
    use_terminal: AtomicBool,
    time: AtomicI64,
    /// Set by `tracker` on burn-out; the controller polls this after each
    /// tick to decide whether to stop the session (§4.4, §4.6).
    stop_requested: AtomicBool,
    terminal_name: SmolStr,
}

impl Engine {
    pub fn new(
        data: Arc<DataStore>,
        account: Account,
        config: EngineConfig,
        broker_bridge: Option<Arc<dyn BrokerBridge>>,
    ) -> Self {
        let start_time = data.range().first().copied().unwrap_or(0);
        Self {
            data,
            ledger: AccountLedger::new(account),
            broker_bridge,
            use_terminal: AtomicBool::new(config.use_terminal),
            time: AtomicI64::new(start_time),
            stop_requested: AtomicBool::new(false),
            terminal_name: config.terminal_name,
        }
    }

    pub fn current_time(&self) -> i64 {
        self.time.load(Ordering::SeqCst)
    }

    /// The controller calls this once per tick, after `cursor.next()`.
    pub fn set_time(&self, time: i64) {
        self.time.store(time, Ordering::SeqCst);
    }

    pub fn set_use_terminal(&self, use_terminal: bool) {
        self.use_terminal.store(use_terminal, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Cooperative shutdown: marks the session stopped without cancelling
    /// any task. The controller observes this on its next round and
    /// broadcasts `StopRequested` instead of advancing further.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    // ---- read-only queries (§4.5) ----

    pub fn get_terminal_info(&self) -> TerminalInfo {
        TerminalInfo {
            name: self.terminal_name.clone(),
            connected: self.broker_bridge.is_some(),
            trade_allowed: true,
        }
    }

    pub fn get_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn get_symbols(&self) -> Vec<SmolStr> {
        self.data.symbols().names().cloned().collect()
    }

    pub fn get_symbols_total(&self) -> usize {
        self.data.symbols().len()
    }

    pub fn get_symbol_info(&self, symbol: &str) -> Result<SymbolInfo, ExecutionError> {
        Ok(self.data.symbol_info(symbol)?.clone())
    }

    pub fn get_symbol_info_tick(&self, symbol: &str) -> Result<RawTick, ExecutionError> {
        Ok(self.data.price_at(symbol, self.current_time())?)
    }

    pub fn get_account_info(&self) -> Account {
        self.ledger.account()
    }

    pub fn copy_rates_from(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        count: usize,
    ) -> Result<Vec<Bar>, ExecutionError> {
        Ok(self.data.copy_rates_from(symbol, timeframe, from, count)?)
    }

    pub fn copy_rates_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, ExecutionError> {
        Ok(self.data.copy_rates_from_pos(symbol, timeframe, start_pos, count)?)
    }

    pub fn copy_rates_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: i64,
        to: i64,
    ) -> Result<Vec<Bar>, ExecutionError> {
        Ok(self.data.copy_rates_range(symbol, timeframe, from, to)?)
    }

    pub fn copy_ticks_from(&self, symbol: &str, from: i64, count: usize) -> Result<Vec<RawTick>, ExecutionError> {
        Ok(self.data.copy_ticks_from(symbol, from, count)?)
    }

    pub fn copy_ticks_range(&self, symbol: &str, from: i64, to: i64) -> Result<Vec<RawTick>, ExecutionError> {
        Ok(self.data.copy_ticks_range(symbol, from, to)?)
    }

    /// Always empty: every accepted order fills immediately (no pending-order
    /// lifecycle, per the Non-goals), so there is never an *active* order
    /// distinct from order history.
    pub fn get_orders(&self) -> Vec<TradeOrder> {
        Vec::new()
    }

    pub fn get_orders_total(&self) -> usize {
        0
    }

    pub fn get_positions(&self) -> Vec<TradePosition> {
        self.get_positions_filtered(&TradeFilter::default())
    }

    pub fn get_positions_filtered(&self, filter: &TradeFilter) -> Vec<TradePosition> {
        self.ledger
            .with(|state| state.positions.positions_get(filter).into_iter().cloned().collect())
    }

    pub fn get_positions_total(&self) -> usize {
        self.ledger.with(|state| state.positions.positions_total())
    }

    pub fn get_history_orders(&self, from: i64, to: i64, filter: &TradeFilter) -> Vec<TradeOrder> {
        self.ledger
            .with(|state| state.orders.get_orders_range(from, to, filter).into_iter().cloned().collect())
    }

    pub fn get_history_orders_total(&self, from: i64, to: i64, filter: &TradeFilter) -> usize {
        self.ledger.with(|state| state.orders.history_orders_total(from, to, filter))
    }

    pub fn get_history_deals(&self, from: i64, to: i64, filter: &TradeFilter) -> Vec<TradeDeal> {
        self.ledger
            .with(|state| state.deals.get_deals_range(from, to, filter).into_iter().cloned().collect())
    }

    pub fn get_history_deals_total(&self, from: i64, to: i64, filter: &TradeFilter) -> usize {
        self.ledger.with(|state| state.deals.history_deals_total(from, to, filter))
    }

    pub fn order_calc_margin(
        &self,
        side: Side,
        symbol: &str,
        volume: Decimal,
        price: Decimal,
    ) -> Result<Decimal, ExecutionError> {
        let now = self.current_time();
        let info = self.data.symbol_info(symbol)?.clone();
        let account_currency = self.ledger.account().currency;
        Ok(self.compute_margin(&info, &account_currency, side, volume, price, now)?)
    }

    pub fn order_calc_profit(
        &self,
        side: Side,
        symbol: &str,
        volume: Decimal,
        price_open: Decimal,
        price_close: Decimal,
    ) -> Result<Decimal, ExecutionError> {
        let now = self.current_time();
        let info = self.data.symbol_info(symbol)?.clone();
        let account_currency = self.ledger.account().currency;
        Ok(self.compute_profit(&info, &account_currency, side, volume, price_open, price_close, now)?)
    }

    // ---- state-mutating operations (§4.5.3 - §4.5.6) ----

    pub fn order_check(&self, request: &OrderRequest) -> OrderCheckResult {
        let now = self.current_time();
        self.ledger.with(|state| match self.validate(state, request, now) {
            Ok(validated) => {
                let projected_margin = state.account.margin + validated.margin;
                let projected_equity = state.account.equity;
                let projected_margin_free = projected_equity - projected_margin;
                let projected_margin_level = if projected_margin > Decimal::ZERO {
                    projected_equity / projected_margin * Decimal::from(100)
                } else {
                    Decimal::ZERO
                };
                OrderCheckResult {
                    retcode: RetCode::Done,
                    balance: state.account.balance,
                    equity: projected_equity,
                    profit: state.account.profit,
                    margin: projected_margin,
                    margin_free: projected_margin_free,
                    margin_level: projected_margin_level,
                }
            }
            Err(retcode) => OrderCheckResult {
                retcode,
                balance: state.account.balance,
                equity: state.account.equity,
                profit: state.account.profit,
                margin: state.account.margin,
                margin_free: state.account.margin_free,
                margin_level: state.account.margin_level,
            },
        })
    }

    pub fn order_send(&self, request: &OrderRequest) -> OrderSendResult {
        let now = self.current_time();
        self.ledger.with(|state| {
            let validated = match self.validate(state, request, now) {
                Ok(v) => v,
                Err(retcode) => {
                    return OrderSendResult {
                        retcode,
                        order: 0,
                        deal: 0,
                        volume: Decimal::ZERO,
                        price: Decimal::ZERO,
                    };
                }
            };

            let order_ticket = state.next_ticket();
            let deal_ticket = state.next_ticket();
            let position_ticket = state.next_ticket();

            state.orders.inner_mut().set(
                order_ticket,
                TradeOrder {
                    ticket: order_ticket,
                    symbol: request.symbol.clone(),
                    side: request.side,
                    volume_initial: request.volume,
                    volume_current: request.volume,
                    price: validated.price,
                    sl: request.sl,
                    tp: request.tp,
                    time_setup: now,
                    time_done: now,
                    state: OrderState::Filled,
                    magic: request.magic,
                    comment: request.comment.clone(),
                    position_id: position_ticket,
                },
            );

            state.deals.inner_mut().set(
                deal_ticket,
                TradeDeal {
                    ticket: deal_ticket,
                    order: order_ticket,
                    position_id: position_ticket,
                    symbol: request.symbol.clone(),
                    side: request.side,
                    entry: DealEntry::In,
                    volume: request.volume,
                    price: validated.price,
                    profit: Decimal::ZERO,
                    commission: Decimal::ZERO,
                    swap: Decimal::ZERO,
                    time: now,
                    magic: request.magic,
                    reason: CloseReason::Manual,
                },
            );

            state.positions.open(
                TradePosition {
                    ticket: position_ticket,
                    symbol: request.symbol.clone(),
                    side: request.side,
                    volume: request.volume,
                    price_open: validated.price,
                    price_current: validated.price,
                    sl: request.sl,
                    tp: request.tp,
                    profit: Decimal::ZERO,
                    swap: Decimal::ZERO,
                    time: now,
                    time_update: now,
                    magic: request.magic,
                    comment: request.comment.clone(),
                    identifier: position_ticket,
                    reason: None,
                },
                validated.margin,
            );

            apply_account_update(state, None, validated.margin, Decimal::ZERO);

            info!(
                symbol = %request.symbol,
                ticket = position_ticket,
                volume = %request.volume,
                price = %validated.price,
                "order filled"
            );

            OrderSendResult {
                retcode: RetCode::Done,
                order: order_ticket,
                deal: deal_ticket,
                volume: request.volume,
                price: validated.price,
            }
        })
    }

    pub fn close_position(&self, ticket: u64) -> bool {
        let now = self.current_time();
        self.ledger
            .with(|state| self.close_position_locked(state, ticket, now, CloseReason::Manual))
    }

    pub fn modify_stops(&self, ticket: u64, sl: Decimal, tp: Decimal) -> bool {
        let now = self.current_time();
        self.ledger.with(|state| {
            if !state.positions.is_open(ticket) {
                return false;
            }
            let Some(position) = state.positions.get(ticket).cloned() else {
                return false;
            };
            let Ok(tick) = self.data.price_at(&position.symbol, now) else {
                return false;
            };
            let Ok(info) = self.data.symbol_info(&position.symbol) else {
                return false;
            };
            let stops_level = info.trade_stops_level;

            if !sl.is_zero() {
                let valid = match position.side {
                    Side::Buy => sl <= tick.bid - stops_level,
                    Side::Sell => sl >= tick.ask + stops_level,
                };
                if !valid {
                    return false;
                }
            }
            if !tp.is_zero() {
                let valid = match position.side {
                    Side::Buy => tp >= tick.bid + stops_level,
                    Side::Sell => tp <= tick.ask - stops_level,
                };
                if !valid {
                    return false;
                }
            }

            if let Some(p) = state.positions.get_mut(ticket) {
                p.sl = sl;
                p.tp = tp;
                p.time_update = now;
            }

            let order_ticket = state.next_ticket();
            state.orders.inner_mut().set(
                order_ticket,
                TradeOrder {
                    ticket: order_ticket,
                    symbol: position.symbol.clone(),
                    side: position.side,
                    volume_initial: Decimal::ZERO,
                    volume_current: Decimal::ZERO,
                    price: Decimal::ZERO,
                    sl,
                    tp,
                    time_setup: now,
                    time_done: now,
                    state: OrderState::Filled,
                    magic: position.magic,
                    comment: position.comment.clone(),
                    position_id: ticket,
                },
            );

            true
        })
    }

    /// Per-tick maintenance (§4.5.7), run once by the controller after every
    /// strategy has checkpointed at the barrier.
    pub fn tracker(&self) {
        let now = self.current_time();
        self.ledger.with(|state| {
            let open_tickets: Vec<u64> = state.positions.open_positions_iter().collect();
            let mut total_profit = Decimal::ZERO;

            for ticket in open_tickets {
                if !state.positions.is_open(ticket) {
                    continue;
                }
                let Some(position) = state.positions.get(ticket).cloned() else {
                    continue;
                };
                let Ok(tick) = self.data.price_at(&position.symbol, now) else {
                    warn!(ticket, symbol = %position.symbol, "tracker: no tick at current time");
                    continue;
                };
                let Ok(info) = self.data.symbol_info(&position.symbol) else {
                    continue;
                };

                let mark = match position.side {
                    Side::Buy => tick.bid,
                    Side::Sell => tick.ask,
                };

                let profit = match self.compute_profit(
                    info,
                    &state.account.currency,
                    position.side,
                    position.volume,
                    position.price_open,
                    mark,
                    now,
                ) {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if let Some(p) = state.positions.get_mut(ticket) {
                    p.price_current = mark;
                    p.profit = profit;
                }

                // SL wins if both trigger on the same tick (§9 pinned tie-break).
                let close_reason = match position.side {
                    Side::Buy if position.sl > Decimal::ZERO && tick.bid <= position.sl => {
                        Some(CloseReason::StopLoss)
                    }
                    Side::Buy if position.tp > Decimal::ZERO && tick.bid >= position.tp => {
                        Some(CloseReason::TakeProfit)
                    }
                    Side::Sell if position.sl > Decimal::ZERO && tick.ask >= position.sl => {
                        Some(CloseReason::StopLoss)
                    }
                    Side::Sell if position.tp > Decimal::ZERO && tick.ask <= position.tp => {
                        Some(CloseReason::TakeProfit)
                    }
                    _ => None,
                };

                if let Some(reason) = close_reason {
                    self.close_position_locked(state, ticket, now, reason);
                } else {
                    total_profit += profit;
                }
            }

            apply_account_update(state, Some(total_profit), Decimal::ZERO, Decimal::ZERO);

            if state.account.is_burned_out() {
                self.stop_requested.store(true, Ordering::SeqCst);
                warn!(time = now, "account burned out, signalling controller to stop");
            }
        });
    }

    /// Closes every open position in ticket order (`close_open_positions_on_exit`).
    pub fn close_all_open(&self) {
        let open: Vec<u64> = self.ledger.with(|state| state.positions.open_positions_iter().collect());
        for ticket in open {
            self.close_position(ticket);
        }
    }

    pub fn wrap_up(&self, close_open_positions: bool) -> EngineReport {
        if close_open_positions {
            self.close_all_open();
        }
        self.ledger.with(|state| EngineReport {
            account_final: state.account.clone(),
            deals: state.deals.inner().values().cloned().collect(),
            positions_closed: state
                .positions
                .all()
                .values()
                .filter(|p| !state.positions.is_open(p.ticket))
                .cloned()
                .collect(),
            orders: state.orders.inner().values().cloned().collect(),
        })
    }

    /// Full ledger contents for snapshot persistence (§6): every order,
    /// deal and position ever recorded, the open-position set, the margin
    /// reserved per open ticket, and the account itself. `quantback`'s
    /// snapshot module pairs this with the data-layer span/range and the
    /// cursor to reconstruct a resumable session.
    pub fn export_ledger(&self) -> LedgerSnapshot {
        self.ledger.with(|state| LedgerSnapshot {
            account: state.account.clone(),
            orders: state.orders.inner().items().map(|(t, o)| (*t, o.clone())).collect(),
            deals: state.deals.inner().items().map(|(t, d)| (*t, d.clone())).collect(),
            positions: state.positions.all().items().map(|(t, p)| (*t, p.clone())).collect(),
            open_positions: state.positions.open_positions_iter().collect(),
            margins: state
                .positions
                .open_positions_iter()
                .filter_map(|t| state.positions.margin_for(t).map(|m| (t, m)))
                .collect(),
        })
    }

    /// Restores a ledger previously produced by [`Self::export_ledger`],
    /// replacing every order/deal/position/margin and the account wholesale.
    /// The ticket counter is reset to the highest restored ticket so newly
    /// minted tickets never collide with history.
    pub fn import_ledger(&self, snapshot: LedgerSnapshot) {
        self.ledger.with(|state| {
            state.account = snapshot.account;

            let mut next = 0u64;
            for (ticket, order) in snapshot.orders {
                next = next.max(ticket);
                state.orders.inner_mut().set(ticket, order);
            }
            for (ticket, deal) in snapshot.deals {
                next = next.max(ticket);
                state.deals.inner_mut().set(ticket, deal);
            }
            for (ticket, position) in snapshot.positions {
                next = next.max(ticket);
                let margin = snapshot.margins.get(&ticket).copied().unwrap_or(Decimal::ZERO);
                if snapshot.open_positions.contains(&ticket) {
                    state.positions.open(position, margin);
                } else {
                    state.positions.all_mut().set(ticket, position);
                }
            }
            for _ in 0..next {
                state.next_ticket();
            }
        });
    }

    // ---- internals ----

    /// The §4.5.3 validation ordering. Takes `&LedgerState` rather than
    /// locking itself, so `order_check` and `order_send` can share it from
    /// within one [`AccountLedger::with`] call.
    fn validate(
        &self,
        state: &LedgerState,
        request: &OrderRequest,
        now: i64,
    ) -> Result<ValidatedOrder, RetCode> {
        let info = self.data.symbol_info(&request.symbol).map_err(|_| RetCode::Invalid)?.clone();

        if !info.is_volume_valid(request.volume) {
            return Err(RetCode::InvalidVolume);
        }

        let tick = self.data.price_at(&request.symbol, now).map_err(|_| RetCode::PriceOff)?;
        let lower = tick.bid - request.deviation;
        let upper = tick.ask + request.deviation;
        if request.price < lower || request.price > upper {
            return Err(RetCode::InvalidPrice);
        }

        let allowed = match (info.trade_mode, request.side) {
            (TradeMode::Disabled, _) => Err(RetCode::TradeDisabled),
            (TradeMode::CloseOnly, _) => Err(RetCode::CloseOnly),
            (TradeMode::LongOnly, Side::Sell) => Err(RetCode::ShortOnly),
            (TradeMode::ShortOnly, Side::Buy) => Err(RetCode::LongOnly),
            _ => Ok(()),
        };
        allowed?;

        let fill_price = match request.side {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        };

        let margin = self
            .compute_margin(&info, &state.account.currency, request.side, request.volume, fill_price, now)
            .map_err(|_| RetCode::Invalid)?;

        if margin > state.account.margin_free {
            return Err(RetCode::NoMoney);
        }

        Ok(ValidatedOrder {
            info,
            price: fill_price,
            margin,
        })
    }

    /// Shared by `close_position` and `tracker` (the latter calls this
    /// directly on its already-locked state instead of going through the
    /// public `close_position`, for the same nested-`with` reason documented
    /// on [`AccountLedger::with`]).
    fn close_position_locked(
        &self,
        state: &mut LedgerState,
        ticket: u64,
        now: i64,
        reason: CloseReason,
    ) -> bool {
        if !state.positions.is_open(ticket) {
            return false;
        }
        let Some(position) = state.positions.get(ticket).cloned() else {
            return false;
        };

        let Ok(tick) = self.data.price_at(&position.symbol, now) else {
            warn!(ticket, symbol = %position.symbol, "close_position: no tick at current time");
            return false;
        };
        let Ok(info) = self.data.symbol_info(&position.symbol) else {
            return false;
        };

        let close_price = match position.side {
            Side::Buy => tick.bid,
            Side::Sell => tick.ask,
        };

        let profit = match self.compute_profit(
            info,
            &state.account.currency,
            position.side,
            position.volume,
            position.price_open,
            close_price,
            now,
        ) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let realized = profit + position.swap;

        let order_ticket = state.next_ticket();
        let deal_ticket = state.next_ticket();

        state.orders.inner_mut().set(
            order_ticket,
            TradeOrder {
                ticket: order_ticket,
                symbol: position.symbol.clone(),
                side: position.side.opposite(),
                volume_initial: position.volume,
                volume_current: Decimal::ZERO,
                price: close_price,
                sl: position.sl,
                tp: position.tp,
                time_setup: now,
                time_done: now,
                state: OrderState::Filled,
                magic: position.magic,
                comment: position.comment.clone(),
                position_id: ticket,
            },
        );

        state.deals.inner_mut().set(
            deal_ticket,
            TradeDeal {
                ticket: deal_ticket,
                order: order_ticket,
                position_id: ticket,
                symbol: position.symbol.clone(),
                side: position.side.opposite(),
                entry: DealEntry::Out,
                volume: position.volume,
                price: close_price,
                profit: realized,
                commission: Decimal::ZERO,
                swap: position.swap,
                time: now,
                magic: position.magic,
                reason,
            },
        );

        let margin_released = state.positions.margin_for(ticket).unwrap_or(Decimal::ZERO);
        state.positions.close(ticket);

        if let Some(closed) = state.positions.get_mut(ticket) {
            closed.reason = Some(reason);
            closed.price_current = close_price;
            closed.profit = realized;
            closed.time_update = now;
        }

        apply_account_update(state, None, -margin_released, realized);

        info!(ticket, symbol = %position.symbol, profit = %realized, ?reason, "position closed");
        true
    }

    fn compute_margin(
        &self,
        info: &SymbolInfo,
        account_currency: &str,
        side: Side,
        volume: Decimal,
        price: Decimal,
        now: i64,
    ) -> Result<Decimal, AccountError> {
        if self.use_terminal.load(Ordering::Relaxed) {
            if let Some(bridge) = &self.broker_bridge {
                if let Ok(margin) = bridge.order_calc_margin(side, &info.name, volume, price) {
                    return Ok(margin);
                }
            }
        }
        calc::calc_margin_local(&self.data, now, info, account_currency, volume, price)
    }

    fn compute_profit(
        &self,
        info: &SymbolInfo,
        account_currency: &str,
        side: Side,
        volume: Decimal,
        price_open: Decimal,
        price_close: Decimal,
        now: i64,
    ) -> Result<Decimal, AccountError> {
        if self.use_terminal.load(Ordering::Relaxed) {
            if let Some(bridge) = &self.broker_bridge {
                if let Ok(profit) = bridge.order_calc_profit(side, &info.name, volume, price_open, price_close) {
                    return Ok(profit);
                }
            }
        }
        calc::order_calc_profit(&self.data, now, info, account_currency, side, volume, price_open, price_close)
    }
}
