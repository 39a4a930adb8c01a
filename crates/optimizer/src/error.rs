use indicatif::style::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),

    #[error("Backtest execution failed within optimizer: {0}")]
    Backtest(#[from] backtester::error::BacktestError),

    #[error("Report calculation failed within optimizer: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Invalid parameter value: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Parameter generation failed: {0}")]
    ParameterGeneration(String),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(String),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<TemplateError> for OptimizerError {
    fn from(error: TemplateError) -> Self {
        OptimizerError::ProgressBarTemplate(error.to_string())
    }
}
