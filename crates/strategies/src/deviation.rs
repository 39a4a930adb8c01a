use crate::{DeviationGauge, Decision, RebalancePolicy, StepContext, cash_to_units};
use core_types::StrategyType;

/// Symmetric drift policy behind `cap_dev` and `pos_dev`.
///
/// Triggers when the gauge's magnitude reaches the threshold or the cadence is due.
/// Only a positive buffer is realized; otherwise the buffer carries forward untouched.
#[derive(Debug, Clone)]
pub struct DeviationRebalance {
    gauge: DeviationGauge,
    threshold: f64,
}

impl DeviationRebalance {
    pub fn new(gauge: DeviationGauge, threshold: f64) -> Self {
        Self { gauge, threshold }
    }
}

impl RebalancePolicy for DeviationRebalance {
    fn kind(&self) -> StrategyType {
        match self.gauge {
            DeviationGauge::Capital => StrategyType::CapDev,
            DeviationGauge::Position => StrategyType::PosDev,
        }
    }

    fn decide(&self, ctx: &StepContext) -> Decision {
        let triggered = self.gauge.read(ctx).abs() >= self.threshold || ctx.due;
        if !triggered || ctx.cum_pnl <= 0.0 {
            return Decision::HOLD;
        }

        Decision {
            diff_lst: cash_to_units(ctx.cum_pnl, ctx.unit_value),
            consumes_buffer: true,
            rebalance: true,
        }
    }
}
