use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which rebalance policy a run uses.
///
/// The tags match the names used in configuration files and sweep definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Rebalance when the un-realized buffer drifts from the capital base in either direction.
    CapDev,
    /// One-sided capital drift; never sheds primary exposure.
    CapDevOnlyBuy,
    /// Rebalance when the primary/hedge cash ratio drifts from parity.
    PosDev,
    /// One-sided position drift; never sheds primary exposure.
    PosDevOnlyBuy,
    /// Cadence-only baseline that converts each due step's P&L.
    #[serde(alias = "every_day")]
    TimeOnly,
}

impl StrategyType {
    pub const ALL: [StrategyType; 5] = [
        StrategyType::CapDev,
        StrategyType::CapDevOnlyBuy,
        StrategyType::PosDev,
        StrategyType::PosDevOnlyBuy,
        StrategyType::TimeOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::CapDev => "cap_dev",
            StrategyType::CapDevOnlyBuy => "cap_dev_only_buy",
            StrategyType::PosDev => "pos_dev",
            StrategyType::PosDevOnlyBuy => "pos_dev_only_buy",
            StrategyType::TimeOnly => "time_only",
        }
    }

    /// Returns true for the variants that never reduce the primary position.
    pub fn is_buy_only(&self) -> bool {
        matches!(self, StrategyType::CapDevOnlyBuy | StrategyType::PosDevOnlyBuy)
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cap_dev" => Ok(StrategyType::CapDev),
            "cap_dev_only_buy" => Ok(StrategyType::CapDevOnlyBuy),
            "pos_dev" => Ok(StrategyType::PosDev),
            "pos_dev_only_buy" => Ok(StrategyType::PosDevOnlyBuy),
            "time_only" | "every_day" => Ok(StrategyType::TimeOnly),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}
