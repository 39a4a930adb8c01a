use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Input series error: {0}")]
    Input(#[from] core_types::CoreError),

    #[error("Rebalance policy error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Invalid backtest parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Input series is empty after trimming to the first valid primary price.")]
    DataUnavailable,

    #[error("Hedge cash value is {value} at {timestamp}; position deviation is undefined")]
    DegenerateHedge { timestamp: String, value: f64 },

    #[error("Non-finite {field} ({value}) produced at {timestamp}")]
    NonFinite {
        field: &'static str,
        value: f64,
        timestamp: String,
    },
}
