#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! Deterministic discrete-event backtesting session: wires the simulated
//! broker ([`quantback_execution::Engine`]) to a fixed-step [`cursor::Clock`]
//! behind a barrier-synchronizing [`controller::Controller`], with
//! configuration, snapshot/resume, and result reporting.

pub mod config;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod logging;
pub mod report;
pub mod snapshot;

pub use config::{AccountInfoConfig, BacktestConfig};
pub use controller::{ControlSignal, Controller};
pub use cursor::{Clock, Cursor};
pub use error::{BacktestError, ControllerError};
pub use report::RunReport;
pub use snapshot::BackTestData;

use quantback_data::DataStore;
use quantback_execution::{Account, Engine, EngineConfig};
use std::sync::Arc;

/// One backtest session: the engine, the market-data store it reads from,
/// and the clock the controller will drive. Built once per run; consumed by
/// [`Session::into_controller`] when the session is ready to execute.
pub struct Session {
    pub engine: Arc<Engine>,
    pub data: Arc<DataStore>,
    pub config: BacktestConfig,
    clock: Clock,
}

impl Session {
    /// Builds a fresh session from `config` over `data` (already finalized
    /// and range-trimmed). The account is seeded from `config.account_info`;
    /// the clock steps by `config.speed` seconds per tick across `data`'s
    /// range.
    pub fn new(config: BacktestConfig, data: DataStore) -> Self {
        let data = Arc::new(data);
        let account = Account::seed(
            config.account_info.login,
            config.account_info.balance,
            config.account_info.leverage,
            config.account_info.currency.clone(),
            config.account_info.margin_so_so,
        );
        let engine_config = EngineConfig {
            use_terminal: config.use_terminal,
            ..EngineConfig::default()
        };
        let engine = Arc::new(Engine::new(data.clone(), account, engine_config, None));
        let clock = Clock::new(data.range().to_vec(), config.speed as usize);

        Self {
            engine,
            data,
            config,
            clock,
        }
    }

    /// Rebuilds a session from a previously captured [`BackTestData`]
    /// snapshot. `config.restart: false` is the expected caller intent —
    /// this always resumes at the snapshot's cursor, leaving the `restart`
    /// decision (whether to call this at all vs. [`Session::new`]) to the
    /// caller.
    pub fn resume(config: BacktestConfig, snapshot: &BackTestData) -> Result<Self, BacktestError> {
        let engine_config = EngineConfig {
            use_terminal: config.use_terminal,
            ..EngineConfig::default()
        };
        let (engine, data, clock) = snapshot::resume(snapshot, engine_config, None, config.speed as usize)?;

        Ok(Self {
            engine,
            data,
            config,
            clock,
        })
    }

    pub fn current_cursor(&self) -> Cursor {
        self.clock.current()
    }

    /// Captures the session's current state for persistence.
    pub fn snapshot(&self, name: impl Into<smol_str::SmolStr>, fully_loaded: bool) -> BackTestData {
        BackTestData::capture(name, &self.data, &self.engine, &self.clock, fully_loaded)
    }

    /// Hands this session off to a [`Controller`] sized for `parties`
    /// strategy tasks, consuming the session.
    pub fn into_controller(self, parties: usize) -> Controller {
        Controller::new(self.engine, self.clock, parties).with_stop_time(self.config.stop_time)
    }

    /// Runs `wrap_up` and packages the result as a [`RunReport`].
    pub fn wrap_up(&self, name: impl Into<smol_str::SmolStr>) -> RunReport {
        let engine_report = self.engine.wrap_up(self.config.close_open_positions_on_exit);
        RunReport::new(name, self.config.start, self.config.end, engine_report, self.config.clone())
    }
}
