use crate::deviation::DeviationRebalance;
use crate::error::StrategyError;
use crate::only_buy::BuyOnlyRebalance;
use crate::time_only::TimeOnly;
use crate::{DeviationGauge, RebalancePolicy};
use core_types::StrategyType;

/// Creates the rebalance policy for a tag.
///
/// `deviation` is the drift threshold; `f64::INFINITY` disables drift triggers entirely.
/// It is ignored by the cadence-only baseline but still validated.
pub fn create_policy(
    kind: StrategyType,
    deviation: f64,
) -> Result<Box<dyn RebalancePolicy>, StrategyError> {
    if deviation.is_nan() || deviation < 0.0 {
        return Err(StrategyError::InvalidParameters(format!(
            "deviation must be a non-negative number, got {}",
            deviation
        )));
    }

    // The compiler will error if a new StrategyType is added but not handled here.
    let policy: Box<dyn RebalancePolicy> = match kind {
        StrategyType::CapDev => {
            Box::new(DeviationRebalance::new(DeviationGauge::Capital, deviation))
        }
        StrategyType::PosDev => {
            Box::new(DeviationRebalance::new(DeviationGauge::Position, deviation))
        }
        StrategyType::CapDevOnlyBuy => {
            Box::new(BuyOnlyRebalance::new(DeviationGauge::Capital, deviation))
        }
        StrategyType::PosDevOnlyBuy => {
            Box::new(BuyOnlyRebalance::new(DeviationGauge::Position, deviation))
        }
        StrategyType::TimeOnly => Box::new(TimeOnly),
    };

    tracing::debug!(policy = %kind, deviation, "Created rebalance policy");
    Ok(policy)
}
