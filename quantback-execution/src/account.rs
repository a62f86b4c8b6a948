use crate::{
    error::AccountError,
    manager::{DealsManager, OrdersManager, PositionsManager},
};
use parking_lot::ReentrantMutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cell::RefCell;

/// Trading permission granted to the account as a whole by the (simulated)
/// broker, distinct from a symbol's own [`quantback_instrument::TradeMode`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AccountTradeMode {
    Demo,
    Contest,
    Real,
}

/// Mutable balance/equity/margin state. Invariants (§3): `equity = balance +
/// profit`; `margin_free = equity - margin`; `margin_level = equity/margin *
/// 100` if `margin > 0` else `0`. Only [`AccountLedger::update_account`] (and
/// the operations built on it) may mutate these.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub login: u64,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin: Decimal,
    pub margin_free: Decimal,
    pub margin_level: Decimal,
    pub profit: Decimal,
    pub leverage: Decimal,
    pub currency: SmolStr,
    pub trade_mode: AccountTradeMode,
    /// Stop-out level as a percentage of margin level (`margin_so_so`, §4.4).
    pub margin_so_so: Decimal,
}

impl Account {
    /// Seeds a fresh account from configured values (§3: "Account is created
    /// from configured seed values").
    pub fn seed(
        login: u64,
        balance: Decimal,
        leverage: Decimal,
        currency: impl Into<SmolStr>,
        margin_so_so: Decimal,
    ) -> Self {
        Self {
            login,
            balance,
            equity: balance,
            margin: Decimal::ZERO,
            margin_free: balance,
            margin_level: Decimal::ZERO,
            profit: Decimal::ZERO,
            leverage,
            currency: currency.into(),
            trade_mode: AccountTradeMode::Demo,
            margin_so_so,
        }
    }

    pub(crate) fn recompute(&mut self) {
        self.equity = self.balance + self.profit;
        self.margin_free = self.equity - self.margin;
        self.margin_level = if self.margin > Decimal::ZERO {
            self.equity / self.margin * Decimal::from(100)
        } else {
            Decimal::ZERO
        };
    }

    /// Burns out when `equity <= 0`, or when there is open margin and the
    /// margin level has fallen below the stop-out threshold. Margin-free
    /// accounts always carry `margin_level == 0` by the §3 invariant, which
    /// would otherwise spuriously trip the stop-out check with no open
    /// exposure — this is gated on `margin > 0` (see DESIGN.md).
    pub fn is_burned_out(&self) -> bool {
        self.equity <= Decimal::ZERO
            || (self.margin > Decimal::ZERO && self.margin_level < self.margin_so_so)
    }
}

/// State protected by the account's reentrant lock: balance/equity/margin
/// plus the trade managers and ticket counter, all mutated together as one
/// logical operation (`order_send` reads the account via `order_check` and
/// then updates it within the same critical section, hence reentrant — §4.4,
/// §9).
#[derive(Debug)]
pub struct LedgerState {
    pub account: Account,
    pub positions: PositionsManager,
    pub orders: OrdersManager,
    pub deals: DealsManager,
    next_ticket: u64,
}

impl LedgerState {
    pub fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

/// Applies one `update_account` step directly to an already-locked
/// [`LedgerState`]. Exists so operations that need to mutate the ledger from
/// *inside* a single [`AccountLedger::with`] call (eg/
/// `Engine::order_send`'s margin reservation, `Engine::close_position`'s
/// balance/margin release) can do so without nesting `with` calls, which
/// would panic on the `RefCell`'s borrow check (see [`AccountLedger::with`]).
pub(crate) fn apply_account_update(
    state: &mut LedgerState,
    profit_replacement: Option<Decimal>,
    margin_delta: Decimal,
    gain_delta: Decimal,
) {
    state.account.balance += gain_delta;
    state.account.margin += margin_delta;
    if let Some(profit) = profit_replacement {
        state.account.profit = profit;
    }
    state.account.recompute();
}

#[derive(Debug)]
pub struct AccountLedger {
    inner: ReentrantMutex<RefCell<LedgerState>>,
}

impl AccountLedger {
    pub fn new(account: Account) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(LedgerState {
                account,
                positions: PositionsManager::new(),
                orders: OrdersManager::new(),
                deals: DealsManager::new(),
                next_ticket: 0,
            })),
        }
    }

    /// Runs `f` with exclusive access to the ledger state. The mutex is
    /// reentrant so a thread already holding it (eg/ one `with` call nested
    /// inside another) cannot deadlock itself; the `RefCell` underneath still
    /// forbids an overlapping *borrow*, so callers share validation logic as
    /// plain functions over `&LedgerState` within one `with` rather than
    /// nesting `with` calls (see [`crate::engine::Engine::order_send`]).
    pub fn with<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    pub fn account(&self) -> Account {
        self.with(|state| state.account.clone())
    }

    /// `update_account(profit_replacement, margin_delta, gain_delta)`. The
    /// spec names the first parameter `profit_delta` but documents it as a
    /// replacement value, not a delta (§4.4) — `profit_replacement: None`
    /// leaves `profit` untouched, matching calls that only move balance or
    /// margin.
    pub fn update_account(
        &self,
        profit_replacement: Option<Decimal>,
        margin_delta: Decimal,
        gain_delta: Decimal,
    ) {
        self.with(|state| apply_account_update(state, profit_replacement, margin_delta, gain_delta));
    }

    pub fn deposit(&self, amount: Decimal) {
        self.update_account(None, Decimal::ZERO, amount);
    }

    pub fn withdraw(&self, amount: Decimal) -> Result<(), AccountError> {
        self.with(|state| {
            if amount > state.account.balance {
                return Err(AccountError::InsufficientBalance {
                    requested: amount,
                    balance: state.account.balance,
                });
            }
            state.account.balance -= amount;
            state.account.recompute();
            Ok(())
        })
    }

    /// Returns `true` if the account has burned out (§4.4).
    pub fn check_account(&self) -> bool {
        self.with(|state| state.account.is_burned_out())
    }
}
