use thiserror::Error;

/// Failures from the cursor/clock and controller (§4.2, §4.6).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum ControllerError {
    #[error("time-out-of-range: {0} is before the current index or past the end of the range")]
    TimeOutOfRange(i64),

    #[error("the strategy barrier was aborted")]
    Aborted,
}

/// Top-level error aggregating every crate's failure domain, for callers
/// that drive a whole backtest session from `quantback`.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Execution(#[from] quantback_execution::ExecutionError),

    #[error(transparent)]
    Data(#[from] quantback_data::DataError),

    #[error(transparent)]
    Symbol(#[from] quantback_instrument::SymbolError),

    #[error("snapshot (de)serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("a strategy task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}
