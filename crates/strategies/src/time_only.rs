use crate::{Decision, RebalancePolicy, StepContext, cash_to_units};
use core_types::StrategyType;

/// Cadence-only baseline.
///
/// On every due step the step's own pre-fee P&L is converted into primary units.
/// The accumulated buffer is neither read nor reset.
#[derive(Debug, Clone, Default)]
pub struct TimeOnly;

impl RebalancePolicy for TimeOnly {
    fn kind(&self) -> StrategyType {
        StrategyType::TimeOnly
    }

    fn decide(&self, ctx: &StepContext) -> Decision {
        if !ctx.due {
            return Decision::HOLD;
        }

        Decision {
            diff_lst: cash_to_units(ctx.total_pnl, ctx.unit_value),
            consumes_buffer: false,
            rebalance: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    #[test]
    fn converts_step_pnl_not_buffer() {
        let mut ctx = context(1.0, 1.0, 500.0, true);
        ctx.total_pnl = -20.0;
        let decision = TimeOnly.decide(&ctx);
        assert_eq!(decision.diff_lst, -0.2);
        assert!(!decision.consumes_buffer);
    }

    #[test]
    fn holds_when_not_due() {
        let mut ctx = context(10.0, 10.0, 500.0, false);
        ctx.total_pnl = 20.0;
        assert_eq!(TimeOnly.decide(&ctx), Decision::HOLD);
    }
}
