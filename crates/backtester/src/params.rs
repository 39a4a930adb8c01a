use crate::error::BacktestError;
use configuration::settings::Config;
use core_types::{ColumnMap, StrategyType};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Target weight of the hedge leg. The primary leg takes the rest.
pub const HEDGE_WEIGHT: f64 = 0.2;
/// Target weight of the primary (looped) leg.
pub const LST_WEIGHT: f64 = 1.0 - HEDGE_WEIGHT;

/// Everything a single backtest run is parameterized by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    pub columns: ColumnMap,
    pub strategy_type: StrategyType,
    /// Drift threshold; `f64::INFINITY` never triggers.
    pub deviation: f64,
    pub initial_capital: f64,
    /// Fee rate on hedge (futures) notional.
    pub fut_fee: f64,
    /// Fee rate on primary (spot) notional.
    pub spot_fee: f64,
    /// Share of the hedge weight that can be backed by primary collateral.
    pub collateral: f64,
    /// Wall-clock cadence in hours; `None` leaves only the policy's own trigger.
    pub rebalance_hours: Option<u32>,
    pub start_hour: u32,
    /// Cross-asset scaling; 0 disables it.
    pub cross_cap: f64,
}

impl BacktestParams {
    pub fn new(
        columns: ColumnMap,
        strategy_type: StrategyType,
        deviation: f64,
        initial_capital: f64,
        fut_fee: f64,
        spot_fee: f64,
    ) -> Self {
        Self {
            columns,
            strategy_type,
            deviation,
            initial_capital,
            fut_fee,
            spot_fee,
            collateral: 1.0,
            rebalance_hours: None,
            start_hour: 0,
            cross_cap: 0.0,
        }
    }

    pub fn with_collateral(mut self, collateral: f64) -> Self {
        self.collateral = collateral;
        self
    }

    pub fn with_cadence(mut self, rebalance_hours: u32, start_hour: u32) -> Self {
        self.rebalance_hours = Some(rebalance_hours);
        self.start_hour = start_hour;
        self
    }

    pub fn with_cross_cap(mut self, cross_cap: f64) -> Self {
        self.cross_cap = cross_cap;
        self
    }

    /// Fraction of capital deployed into the primary asset.
    pub fn deploy_ratio(&self) -> f64 {
        LST_WEIGHT + (1.0 - LST_WEIGHT) * self.collateral
    }

    /// Hedge notional required per unit of weighted primary exposure.
    pub fn hedge_ratio(&self) -> f64 {
        HEDGE_WEIGHT * (self.deploy_ratio() / HEDGE_WEIGHT)
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid(
                "initial_capital",
                format!("must be a positive number, got {}", self.initial_capital),
            ));
        }
        for (name, fee) in [("fut_fee", self.fut_fee), ("spot_fee", self.spot_fee)] {
            if !fee.is_finite() || fee < 0.0 {
                return Err(invalid(name, format!("must be a non-negative rate, got {}", fee)));
            }
        }
        if !self.collateral.is_finite() {
            return Err(invalid("collateral", format!("must be finite, got {}", self.collateral)));
        }
        if !self.cross_cap.is_finite() {
            return Err(invalid("cross_cap", format!("must be finite, got {}", self.cross_cap)));
        }
        if self.cross_cap > 0.0 && self.columns.cross_price.is_none() {
            return Err(invalid(
                "cross_cap",
                "cross scaling is enabled but no cross price column is configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl TryFrom<&Config> for BacktestParams {
    type Error = BacktestError;

    /// A missing deviation becomes `f64::INFINITY`, so only the cadence can trigger.
    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let rebalance = &config.rebalance;
        let deviation = match rebalance.deviation {
            Some(d) => to_f64("deviation", d)?,
            None => f64::INFINITY,
        };
        let mut params = BacktestParams::new(
            config.columns.clone(),
            rebalance.strategy_type,
            deviation,
            to_f64("initial_capital", config.backtest.initial_capital)?,
            to_f64("fut_fee", config.fees.fut_fee)?,
            to_f64("spot_fee", config.fees.spot_fee)?,
        )
        .with_collateral(to_f64("collateral", config.backtest.collateral)?)
        .with_cross_cap(to_f64("cross_cap", config.backtest.cross_cap)?);
        params.rebalance_hours = rebalance.rebalance_hours;
        params.start_hour = rebalance.start_hour;
        Ok(params)
    }
}

fn to_f64(name: &'static str, value: Decimal) -> Result<f64, BacktestError> {
    value
        .to_f64()
        .ok_or_else(|| invalid(name, format!("{value} does not fit a float")))
}

fn invalid(name: &'static str, reason: String) -> BacktestError {
    BacktestError::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMap {
        ColumnMap {
            lst_price: "lst".into(),
            lst_return: "lst_ret".into(),
            hedge_price: "hedge".into(),
            hedge_return: "hedge_ret".into(),
            funding: "funding".into(),
            cross_price: None,
        }
    }

    #[test]
    fn full_collateral_deploys_everything() {
        let params = BacktestParams::new(columns(), StrategyType::CapDev, 0.01, 1000.0, 0.0, 0.0);
        assert_eq!(params.deploy_ratio(), 1.0);
    }

    #[test]
    fn partial_collateral_shrinks_deployment() {
        let params = BacktestParams::new(columns(), StrategyType::CapDev, 0.01, 1000.0, 0.0, 0.0)
            .with_collateral(0.5);
        assert!((params.deploy_ratio() - 0.9).abs() < 1e-12);
        assert!((params.hedge_ratio() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_capital() {
        let params = BacktestParams::new(columns(), StrategyType::CapDev, 0.01, 0.0, 0.0, 0.0);
        assert!(matches!(
            params.validate(),
            Err(BacktestError::InvalidParameter { name: "initial_capital", .. })
        ));
    }

    #[test]
    fn converts_from_loaded_config() {
        let config = configuration::load_config_from_str(
            r#"
            [data]
            input_path = "hourly.csv"
            [columns]
            lst_price = "lst"
            lst_return = "lst_ret"
            hedge_price = "hedge"
            hedge_return = "hedge_ret"
            funding = "funding"
            [backtest]
            initial_capital = 2500
            collateral = 0.75
            [fees]
            spot_fee = 0.001
            fut_fee = 0.0004
            [rebalance]
            strategy_type = "cap_dev_only_buy"
            rebalance_hours = 8
            start_hour = 2
            "#,
        )
        .unwrap();

        let params = BacktestParams::try_from(&config).unwrap();
        assert_eq!(params.columns, columns());
        assert_eq!(params.strategy_type, StrategyType::CapDevOnlyBuy);
        assert_eq!(params.deviation, f64::INFINITY);
        assert_eq!(params.initial_capital, 2500.0);
        assert_eq!(params.collateral, 0.75);
        assert_eq!(params.spot_fee, 0.001);
        assert_eq!(params.rebalance_hours, Some(8));
        assert_eq!(params.start_hour, 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn cross_scaling_needs_a_cross_column() {
        let params = BacktestParams::new(columns(), StrategyType::CapDev, 0.01, 1000.0, 0.0, 0.0)
            .with_cross_cap(1.0);
        assert!(params.validate().is_err());
    }
}
