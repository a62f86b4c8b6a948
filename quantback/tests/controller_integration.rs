//! End-to-end coverage of the barrier-synchronized controller driving real
//! strategy tasks: concurrent strategies trading the same symbol from
//! opposite sides, and an immediate abort while a strategy is mid-wait.

use quantback::controller::{ControlSignal, Controller};
use quantback::cursor::Clock;
use quantback_data::{DataStore, RawTick};
use quantback_execution::{Account, Engine, EngineConfig, OrderRequest, RetCode, Side};
use quantback_instrument::symbol::{CalcMode, TradeMode};
use quantback_instrument::SymbolCatalog;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::{watch, Barrier};

fn eurusd() -> quantback_instrument::SymbolInfo {
    quantback_instrument::SymbolInfo {
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

fn raw_tick(time: i64) -> RawTick {
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

fn engine_and_clock(span: i64) -> (Arc<Engine>, Clock) {
    let mut catalog = SymbolCatalog::new();
    catalog.insert(eurusd()).unwrap();
    let mut store = DataStore::new(catalog);
    store.load_ticks("EURUSD", (0..span).map(raw_tick).collect());
    store.finalize(0, span).unwrap();
    let account = Account::seed(1, dec!(100000), dec!(100), "USD", dec!(50));
    let data = Arc::new(store);
    let engine = Arc::new(Engine::new(data.clone(), account, EngineConfig::default(), None));
    let clock = Clock::new(data.range().to_vec(), 1);
    (engine, clock)
}

/// A single-tick session: the controller's barrier loop makes exactly one
/// `wait()` call before observing a terminal clock, matching strategies that
/// only participate in one round.
#[tokio::test]
async fn two_strategies_open_opposite_sides_on_the_same_symbol() {
    let (engine, clock) = engine_and_clock(1);
    let controller = Controller::new(engine.clone(), clock, 2);
    let barrier = Arc::new(Barrier::new(3));

    let buy_engine = engine.clone();
    let buy_barrier = barrier.clone();
    let buyer = tokio::spawn(async move {
        buy_barrier.wait().await;
        let tick = buy_engine.get_symbol_info_tick("EURUSD").unwrap();
        buy_engine.order_send(&OrderRequest {
            symbol: "EURUSD".into(),
            side: Side::Buy,
            volume: dec!(1),
            price: tick.ask,
            deviation: dec!(0.0010),
            sl: Decimal::ZERO,
            tp: Decimal::ZERO,
            magic: 1,
            comment: "buyer".into(),
        })
    });

    let sell_engine = engine.clone();
    let sell_barrier = barrier.clone();
    let seller = tokio::spawn(async move {
        sell_barrier.wait().await;
        let tick = sell_engine.get_symbol_info_tick("EURUSD").unwrap();
        sell_engine.order_send(&OrderRequest {
            symbol: "EURUSD".into(),
            side: Side::Sell,
            volume: dec!(1),
            price: tick.bid,
            deviation: dec!(0.0010),
            sl: Decimal::ZERO,
            tp: Decimal::ZERO,
            magic: 2,
            comment: "seller".into(),
        })
    });

    let controller_handle = tokio::spawn(controller.run(barrier));
    let (buy_result, sell_result) = tokio::join!(buyer, seller);
    controller_handle.await.unwrap().unwrap();

    assert_eq!(buy_result.unwrap().retcode, RetCode::Done);
    assert_eq!(sell_result.unwrap().retcode, RetCode::Done);
    assert_eq!(engine.get_positions_total(), 2);
}

#[tokio::test]
async fn abort_cancels_a_strategy_blocked_on_the_barrier() {
    let (engine, clock) = engine_and_clock(5);
    let mut controller = Controller::new(engine, clock, 2);
    let mut rx = controller.subscribe();
    let barrier = Arc::new(Barrier::new(3));

    // Only one of the two registered strategies ever reaches the barrier;
    // the other is parked forever, simulating a strategy that hung before
    // calling `wait`.
    let lone_barrier = barrier.clone();
    let lone_strategy = tokio::spawn(async move {
        lone_barrier.wait().await;
    });
    let never_arrives = tokio::spawn(futures::future::pending::<()>());

    controller.add_task(lone_strategy);
    controller.add_task(never_arrives);
    controller.abort();

    let signal = next_round(&mut rx).await;
    assert_eq!(signal, ControlSignal::Aborted);
}

async fn next_round(rx: &mut watch::Receiver<ControlSignal>) -> ControlSignal {
    rx.changed().await.expect("controller dropped the channel");
    *rx.borrow()
}
