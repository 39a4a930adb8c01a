use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The parameters a sweep is allowed to vary.
pub const SWEEPABLE: [&str; 6] = [
    "collateral",
    "deviation",
    "funding",
    "rebalance_hours",
    "start_hour",
    "strategy_type",
];

/// Defines a parameter sweep. This is deserialized from the `optimizer.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Keyed by parameter name; a `BTreeMap` keeps the grid order stable.
    pub parameter_space: BTreeMap<String, ParameterRange>,
    #[serde(default)] // Use default values if the [analysis] section is missing
    pub analysis: AnalysisConfig,
    /// Worker threads for the sweep. Defaults to one per core.
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Configuration for the filtering and ranking of sweep results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub ranking: Ranking,
}

/// Hard filters to discard unacceptable runs before ranking.
#[derive(Debug, Clone, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub min_rebalances: usize,
    /// Expressed in percent, e.g. 25 for a 25% drawdown.
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ranking {
    #[serde(default)]
    pub rank_by: RankMetric,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Sort smallest first. Useful for drawdown or volatility.
    #[serde(default)]
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    #[default]
    Sharpe,
    Sortino,
    TotalReturn,
    MaxDrawdown,
    Volatility,
    MonthlyReturn,
    FinalCapital,
    Cvar,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            min_rebalances: 0,
            max_drawdown_pct: default_max_drawdown_pct(),
        }
    }
}

impl Default for Ranking {
    fn default() -> Self {
        Self {
            rank_by: RankMetric::default(),
            top_n: default_top_n(),
            ascending: false,
        }
    }
}

fn default_max_drawdown_pct() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_top_n() -> usize {
    10
}

/// Represents a range of values for a single parameter to be tested.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterRange {
    DiscreteInt(Vec<i64>),
    DiscreteDecimal(Vec<Decimal>),
    DiscreteText(Vec<String>),
    LinearInt { start: i64, end: i64, step: i64 },
    LinearDecimal { start: Decimal, end: Decimal, step: Decimal },
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parameter_space.is_empty() {
            return Err(ConfigError::ValidationError(
                "parameter_space must name at least one parameter".to_string(),
            ));
        }
        for (name, range) in &self.parameter_space {
            if !SWEEPABLE.contains(&name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "'{name}' cannot be swept; expected one of {}",
                    SWEEPABLE.join(", ")
                )));
            }
            range.validate(name)?;
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ParameterRange {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let bad = |reason: &str| ConfigError::ValidationError(format!("{name}: {reason}"));
        match self {
            ParameterRange::DiscreteInt(v) if v.is_empty() => Err(bad("no values")),
            ParameterRange::DiscreteDecimal(v) if v.is_empty() => Err(bad("no values")),
            ParameterRange::DiscreteText(v) if v.is_empty() => Err(bad("no values")),
            ParameterRange::LinearInt { start, end, step } => {
                if *step <= 0 {
                    Err(bad("step must be positive"))
                } else if end < start {
                    Err(bad("end must not be below start"))
                } else {
                    Ok(())
                }
            }
            ParameterRange::LinearDecimal { start, end, step } => {
                if *step <= Decimal::ZERO {
                    Err(bad("step must be positive"))
                } else if end < start {
                    Err(bad("end must not be below start"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}
