use crate::error::ConfigError;
use crate::optimizer_config::OptimizerConfig;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod optimizer_config;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use optimizer_config::{AnalysisConfig, Filters, ParameterRange, RankMetric, Ranking};
pub use settings::{
    BacktestSettings, DataSettings, FeeSettings, LoggingSettings, MetricsSettings,
    RebalanceSettings, RunOverrides,
};

/// Prefix for environment overrides, e.g. `HEDGELOOP__FEES__SPOT_FEE=0.001`.
pub const ENV_PREFIX: &str = "HEDGELOOP";

/// Loads and validates the run configuration.
///
/// The TOML file is read first, then any `HEDGELOOP__SECTION__KEY` variables
/// are layered on top.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    finish(builder)
}

/// Same as [`load_config`] without touching the filesystem or environment.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(builder)
}

/// Loads and validates a sweep definition.
pub fn load_optimizer_config(path: &Path) -> Result<OptimizerConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .build()?;

    let config = builder.try_deserialize::<OptimizerConfig>()?;
    config.validate()?;
    Ok(config)
}

pub fn load_optimizer_config_from_str(toml: &str) -> Result<OptimizerConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let config = builder.try_deserialize::<OptimizerConfig>()?;
    config.validate()?;
    Ok(config)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
