use crate::{DeviationGauge, Decision, RebalancePolicy, StepContext, cash_to_units};
use core_types::StrategyType;

/// One-sided drift policy behind `cap_dev_only_buy` and `pos_dev_only_buy`.
///
/// Fires only on upward drift (or a due cadence) while the buffer is positive,
/// and never produces a negative trade.
#[derive(Debug, Clone)]
pub struct BuyOnlyRebalance {
    gauge: DeviationGauge,
    threshold: f64,
}

impl BuyOnlyRebalance {
    pub fn new(gauge: DeviationGauge, threshold: f64) -> Self {
        Self { gauge, threshold }
    }
}

impl RebalancePolicy for BuyOnlyRebalance {
    fn kind(&self) -> StrategyType {
        match self.gauge {
            DeviationGauge::Capital => StrategyType::CapDevOnlyBuy,
            DeviationGauge::Position => StrategyType::PosDevOnlyBuy,
        }
    }

    fn decide(&self, ctx: &StepContext) -> Decision {
        let triggered = (self.gauge.read(ctx) >= self.threshold || ctx.due) && ctx.cum_pnl > 0.0;
        if !triggered {
            return Decision::HOLD;
        }

        Decision {
            diff_lst: cash_to_units(ctx.cum_pnl, ctx.unit_value).max(0.0),
            consumes_buffer: true,
            rebalance: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    #[test]
    fn downward_drift_never_triggers() {
        let policy = BuyOnlyRebalance::new(DeviationGauge::Capital, 0.05);
        assert_eq!(policy.decide(&context(-0.5, 0.0, 10.0, false)), Decision::HOLD);
    }

    #[test]
    fn upward_drift_with_positive_buffer_buys() {
        let policy = BuyOnlyRebalance::new(DeviationGauge::Position, 0.05);
        let decision = policy.decide(&context(0.0, 0.05, 30.0, false));
        assert!(decision.consumes_buffer);
        assert_eq!(decision.diff_lst, 0.3);
    }

    #[test]
    fn due_cadence_still_requires_positive_buffer() {
        let policy = BuyOnlyRebalance::new(DeviationGauge::Capital, 0.05);
        assert_eq!(policy.decide(&context(0.0, 0.0, 0.0, true)), Decision::HOLD);
        assert!(policy.decide(&context(0.0, 0.0, 0.5, true)).rebalance);
    }

    #[test]
    fn trade_is_clamped_at_zero_for_negative_unit_value() {
        let policy = BuyOnlyRebalance::new(DeviationGauge::Capital, 0.0);
        let mut ctx = context(0.1, 0.0, 5.0, false);
        ctx.unit_value = -1.0;
        let decision = policy.decide(&ctx);
        assert_eq!(decision.diff_lst, 0.0);
        assert!(decision.consumes_buffer);
    }
}
