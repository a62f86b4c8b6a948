//! Barrier-synchronized advance of the engine clock across strategy tasks
//! (§4.6, §5). Every registered strategy waits on the shared barrier once per
//! tick; once all have arrived the controller advances the engine's time,
//! runs `tracker` (SL/TP checks, burn-out check), steps the `Clock`, and
//! releases the barrier for the next round.

use crate::cursor::{Clock, Cursor};
use crate::error::ControllerError;
use quantback_execution::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Barrier};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Broadcast to every waiting strategy at the top of each round.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ControlSignal {
    /// Normal operation; `Cursor` is the round that just started.
    Running(Cursor),
    /// The session reached its terminal tick or a strategy requested a stop;
    /// no further rounds will run.
    StopRequested(Cursor),
    /// `Controller::abort` was called; strategies must return immediately.
    Aborted,
}

/// Owns the shared [`Barrier`], the live [`Clock`], and the registered
/// strategy task handles for one backtest session.
pub struct Controller {
    engine: Arc<Engine>,
    clock: Clock,
    parties: AtomicUsize,
    tx: watch::Sender<ControlSignal>,
    tasks: Vec<JoinHandle<()>>,
    stop_time: Option<i64>,
}

impl Controller {
    /// `parties` is the number of strategy tasks that will call
    /// [`Controller::wait`] each round, in addition to the controller's own
    /// driving loop — i.e. the `Barrier` is built for `parties + 1`.
    pub fn new(engine: Arc<Engine>, clock: Clock, parties: usize) -> Self {
        let initial = clock.current();
        let (tx, _rx) = watch::channel(ControlSignal::Running(initial));
        Self {
            engine,
            clock,
            parties: AtomicUsize::new(parties),
            tx,
            tasks: Vec::new(),
            stop_time: None,
        }
    }

    /// Sets the early-cut termination time (`BacktestConfig::stop_time`);
    /// `run` will not advance the cursor past it.
    pub fn with_stop_time(mut self, stop_time: Option<i64>) -> Self {
        self.stop_time = stop_time;
        self
    }

    /// A fresh receiver strategies subscribe to before entering their loop.
    pub fn subscribe(&self) -> watch::Receiver<ControlSignal> {
        self.tx.subscribe()
    }

    /// Registers a strategy task's handle so [`Controller::abort`] can cancel
    /// it. Does not change the party count: sizing the barrier is the
    /// caller's responsibility via [`Controller::new`]'s `parties`.
    pub fn add_task(&mut self, handle: JoinHandle<()>) {
        self.tasks.push(handle);
    }

    pub fn parties(&self) -> usize {
        self.parties.load(Ordering::Relaxed)
    }

    /// Requests a graceful stop: the round in progress finishes normally
    /// (the tracker still runs, no task is cancelled) and `run` broadcasts
    /// `StopRequested` on its next iteration. Unlike [`Controller::abort`],
    /// this does not consume the controller or touch registered tasks.
    pub fn stop_backtesting(&self) {
        self.engine.request_stop();
    }

    /// Drives the session to completion: builds a `Barrier` sized for the
    /// registered parties plus the controller itself, then alternates
    /// `barrier.wait()` with a tick advance until the clock is terminal or a
    /// stop is requested. Strategies participate in the same barrier by
    /// calling [`Controller::wait`] with a handle obtained up front.
    pub async fn run(mut self, barrier: Arc<Barrier>) -> Result<Vec<JoinHandle<()>>, ControllerError> {
        loop {
            barrier.wait().await;

            self.engine.tracker();

            if self.engine.stop_requested() {
                warn!("backtest stopping: engine reported stop_requested");
                let cursor = self.clock.current();
                let _ = self.tx.send(ControlSignal::StopRequested(cursor));
                break;
            }

            if self.clock.is_terminal() {
                let cursor = self.clock.current();
                let _ = self.tx.send(ControlSignal::StopRequested(cursor));
                break;
            }

            if let Some(stop_time) = self.stop_time {
                if self.clock.current().time >= stop_time {
                    warn!(stop_time, "backtest stopping: reached configured stop_time");
                    let cursor = self.clock.current();
                    let _ = self.tx.send(ControlSignal::StopRequested(cursor));
                    break;
                }
            }

            let cursor = self.clock.next();
            self.engine.set_time(cursor.time);
            info!(index = cursor.index, time = cursor.time, "advanced cursor");
            let _ = self.tx.send(ControlSignal::Running(cursor));
        }

        Ok(self.tasks)
    }

    /// Jumps the clock directly to `time`, bypassing the per-tick loop. Used
    /// by strategies that want to fast-forward through a quiet period; does
    /// not touch the barrier, so callers must still observe the next
    /// broadcast `Cursor` through the normal channel.
    pub fn go_to(&mut self, time: i64) -> Result<Cursor, ControllerError> {
        let cursor = self.clock.go_to(time)?;
        self.engine.set_time(cursor.time);
        Ok(cursor)
    }

    /// Immediately ends the session: aborts every registered task and
    /// broadcasts [`ControlSignal::Aborted`] so any strategy still waiting on
    /// the barrier observes it on its next poll rather than blocking forever.
    pub fn abort(mut self) {
        let _ = self.tx.send(ControlSignal::Aborted);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantback_data::DataStore;
    use quantback_execution::{Account, EngineConfig};
    use quantback_instrument::SymbolCatalog;
    use rust_decimal_macros::dec;

    fn empty_engine() -> Arc<Engine> {
        let store = DataStore::new(SymbolCatalog::new());
        let account = Account::seed(1, dec!(10000), dec!(100), "USD", dec!(50));
        Arc::new(Engine::new(Arc::new(store), account, EngineConfig::default(), None))
    }

    #[tokio::test]
    async fn run_stops_at_terminal_cursor_without_any_strategies() {
        let engine = empty_engine();
        let clock = Clock::new(vec![0, 1, 2], 1);
        let controller = Controller::new(engine, clock, 0);
        let mut rx = controller.subscribe();
        let barrier = Arc::new(Barrier::new(1));

        let handle = tokio::spawn(controller.run(barrier));
        let remaining = handle.await.unwrap().unwrap();
        assert!(remaining.is_empty());

        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow(), ControlSignal::StopRequested(_)));
    }

    #[tokio::test]
    async fn abort_broadcasts_aborted_signal() {
        let engine = empty_engine();
        let clock = Clock::new(vec![0, 1, 2], 1);
        let mut controller = Controller::new(engine, clock, 0);
        let mut rx = controller.subscribe();
        let never_finishes = tokio::spawn(futures::future::pending::<()>());
        controller.add_task(never_finishes);

        controller.abort();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ControlSignal::Aborted);
    }

    #[tokio::test]
    async fn stop_backtesting_ends_the_round_without_cancelling_tasks() {
        let engine = empty_engine();
        let clock = Clock::new(vec![0, 1, 2, 3, 4], 1);
        let controller = Controller::new(engine, clock, 0);
        let mut rx = controller.subscribe();

        controller.stop_backtesting();

        let barrier = Arc::new(Barrier::new(1));
        let handle = tokio::spawn(controller.run(barrier));
        let remaining = handle.await.unwrap().unwrap();
        assert!(remaining.is_empty());

        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow(), ControlSignal::StopRequested(_)));
    }

    #[tokio::test]
    async fn run_refuses_to_advance_past_configured_stop_time() {
        let engine = empty_engine();
        let clock = Clock::new(vec![0, 1, 2, 3, 4], 1);
        let controller = Controller::new(engine, clock, 0).with_stop_time(Some(2));
        let mut rx = controller.subscribe();
        let barrier = Arc::new(Barrier::new(1));

        let handle = tokio::spawn(controller.run(barrier));
        handle.await.unwrap().unwrap();

        rx.changed().await.unwrap();
        match *rx.borrow() {
            ControlSignal::StopRequested(cursor) => assert_eq!(cursor.time, 2),
            other => panic!("expected StopRequested at time 2, got {other:?}"),
        }
    }
}
