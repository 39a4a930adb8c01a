use crate::error::ConfigError;
use core_types::{ColumnMap, StrategyType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataSettings,
    pub columns: ColumnMap,
    pub backtest: BacktestSettings,
    pub fees: FeeSettings,
    pub rebalance: RebalanceSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the aligned input table lives.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    /// Parquet or CSV file holding the aligned series.
    pub input_path: PathBuf,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
}

/// Capital and position sizing for a backtest.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSettings {
    /// The initial starting capital for the simulation.
    pub initial_capital: Decimal,
    /// Share of the hedge weight backed by reused primary collateral.
    #[serde(default = "default_collateral")]
    pub collateral: Decimal,
    /// Cross-asset scaling of the primary leg; 0 disables it.
    #[serde(default)]
    pub cross_cap: Decimal,
}

/// Trading fee rates. 0.0004 corresponds to 0.04%.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeSettings {
    pub spot_fee: Decimal,
    pub fut_fee: Decimal,
}

/// Which policy runs and what triggers it.
#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceSettings {
    pub strategy_type: StrategyType,
    /// Drift threshold. Omit it to disable drift triggers.
    #[serde(default)]
    pub deviation: Option<Decimal>,
    /// Wall-clock cadence in hours.
    #[serde(default)]
    pub rebalance_hours: Option<u32>,
    #[serde(default)]
    pub start_hour: u32,
}

/// Parameters for the post-run performance metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    #[serde(default)]
    pub risk_free_rate: Decimal,
    /// Named annual reference rates. Sharpe and Sortino are also reported against each.
    #[serde(default)]
    pub benchmarks: BTreeMap<String, Decimal>,
    /// Compound hourly returns into daily ones before computing ratios.
    #[serde(default = "default_true")]
    pub resample_daily: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            periods_per_year: default_periods_per_year(),
            risk_free_rate: Decimal::ZERO,
            benchmarks: BTreeMap::new(),
            resample_daily: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_timestamp_column() -> String {
    "timestamp".to_string()
}

fn default_collateral() -> Decimal {
    Decimal::ONE
}

fn default_periods_per_year() -> u32 {
    365
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "hedgeloop.log".to_string()
}

impl Config {
    /// Checks the values serde cannot: signs, ranges and cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.initial_capital <= Decimal::ZERO {
            return Err(invalid("backtest.initial_capital must be positive"));
        }
        if self.fees.spot_fee < Decimal::ZERO || self.fees.fut_fee < Decimal::ZERO {
            return Err(invalid("fee rates must not be negative"));
        }
        if self.fees.spot_fee >= dec!(1) || self.fees.fut_fee >= dec!(1) {
            return Err(invalid("fee rates are fractions and must be below 1"));
        }
        if let Some(deviation) = self.rebalance.deviation {
            if deviation < Decimal::ZERO {
                return Err(invalid("rebalance.deviation must not be negative"));
            }
        }
        if self.rebalance.rebalance_hours == Some(0) {
            return Err(invalid("rebalance.rebalance_hours must be at least 1"));
        }
        if self.rebalance.start_hour >= 24 {
            return Err(invalid("rebalance.start_hour must be within 0..24"));
        }
        if self.backtest.cross_cap > Decimal::ZERO && self.columns.cross_price.is_none() {
            return Err(invalid(
                "backtest.cross_cap is set but columns.cross_price is missing",
            ));
        }
        if self.metrics.periods_per_year == 0 {
            return Err(invalid("metrics.periods_per_year must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

/// Command-line overrides for the run settings.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct RunOverrides {
    /// Override the rebalance policy
    /// (cap_dev, cap_dev_only_buy, pos_dev, pos_dev_only_buy, time_only).
    #[cfg_attr(feature = "clap", arg(long))]
    pub strategy_type: Option<StrategyType>,

    /// Override the drift threshold.
    #[cfg_attr(feature = "clap", arg(long))]
    pub deviation: Option<Decimal>,

    /// Override the rebalance cadence in hours.
    #[cfg_attr(feature = "clap", arg(long))]
    pub rebalance_hours: Option<u32>,

    /// Override the funding column.
    #[cfg_attr(feature = "clap", arg(long))]
    pub funding: Option<String>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(kind) = overrides.strategy_type {
            self.rebalance.strategy_type = kind;
        }
        if let Some(deviation) = overrides.deviation {
            self.rebalance.deviation = Some(deviation);
        }
        if let Some(hours) = overrides.rebalance_hours {
            self.rebalance.rebalance_hours = Some(hours);
        }
        if let Some(funding) = &overrides.funding {
            self.columns.funding = funding.clone();
        }
    }
}
