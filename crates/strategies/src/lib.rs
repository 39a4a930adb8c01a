//! # Hedgeloop Rebalance Policies
//!
//! This crate decides, at every step of a backtest, whether the looped position is resized
//! and by how much. It defines a universal `RebalancePolicy` trait and the concrete
//! policies behind each `StrategyType` tag.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** Policies see a read-only `StepContext` and return a `Decision`. They
//!   never touch simulation state; the backtester applies the decision.
//! - **Shared Sizing:** Every policy converts a cash amount into primary-asset units through
//!   the same helper, so the variants differ only in their trigger and clamp rules.
//! - **Extensibility:** A new policy implements the trait and gets a branch in `factory`.
//!
//! ## Public API
//!
//! - `RebalancePolicy`: The core trait all policies implement.
//! - `create_policy`: The factory function mapping a `StrategyType` to a policy.
//! - `RebalanceCadence`: The wall-clock trigger shared by every policy.

// Declare all the modules that constitute this crate.
pub mod cadence;
pub mod deviation;
pub mod error;
pub mod factory;
pub mod only_buy;
pub mod time_only;

// Re-export the key components to create a clean, public-facing API.
pub use cadence::RebalanceCadence;
pub use deviation::DeviationRebalance;
pub use error::StrategyError;
pub use factory::create_policy;
pub use only_buy::BuyOnlyRebalance;
pub use time_only::TimeOnly;

// Re-export StrategyType from core_types
pub use core_types::StrategyType;

use serde::{Deserialize, Serialize};

/// Everything a policy may look at when deciding on a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Un-realized buffer relative to the starting capital.
    pub capital_dev: f64,
    /// Primary cash over hedge cash, minus one.
    pub position_dev: f64,
    /// P&L accumulated since the last consuming rebalance, including this step.
    pub cum_pnl: f64,
    /// This step's pre-fee total P&L.
    pub total_pnl: f64,
    /// Cash value of one primary unit at this step.
    pub unit_value: f64,
    /// Whether the wall-clock cadence fires on this step.
    pub due: bool,
}

/// The outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Signed change in primary units.
    pub diff_lst: f64,
    /// The buffer was realized into the position and must be reset.
    pub consumes_buffer: bool,
    /// A trade was placed on this step.
    pub rebalance: bool,
}

impl Decision {
    pub const HOLD: Decision = Decision {
        diff_lst: 0.0,
        consumes_buffer: false,
        rebalance: false,
    };
}

/// Which drift measure a deviation policy watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationGauge {
    Capital,
    Position,
}

impl DeviationGauge {
    pub fn read(&self, ctx: &StepContext) -> f64 {
        match self {
            DeviationGauge::Capital => ctx.capital_dev,
            DeviationGauge::Position => ctx.position_dev,
        }
    }
}

/// The core trait that all rebalance policies must implement.
///
/// A policy is chosen once per run and applied identically at every step.
/// The `Send + Sync` bounds let sweeps run policies on a thread pool.
pub trait RebalancePolicy: Send + Sync {
    /// The tag this policy was built from.
    fn kind(&self) -> StrategyType;

    /// Evaluates the policy for one step.
    fn decide(&self, ctx: &StepContext) -> Decision;
}

/// Converts a cash amount into primary-asset units at the step's unit value.
pub(crate) fn cash_to_units(amount: f64, unit_value: f64) -> f64 {
    amount / unit_value
}

#[cfg(test)]
pub(crate) fn context(capital_dev: f64, position_dev: f64, cum_pnl: f64, due: bool) -> StepContext {
    StepContext {
        capital_dev,
        position_dev,
        cum_pnl,
        total_pnl: 0.0,
        unit_value: 100.0,
        due,
    }
}
