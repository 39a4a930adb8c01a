use chrono::{DateTime, Utc};
use core_types::StrategyType;
use serde::{Deserialize, Serialize};

/// The full simulation state and step attribution for one bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub timestamp: DateTime<Utc>,
    pub lst_price: f64,
    pub hedge_price: f64,
    /// `max(1, cross_cap * cross_price)`; 1 when cross scaling is off.
    pub cross_factor: f64,

    // --- Position state ---
    pub capital: f64,
    pub count_loop: f64,
    pub count_hedge: f64,
    pub diff_lst: f64,
    pub diff_hedge: f64,
    pub cum_pnl: f64,
    pub rebalanced: bool,

    // --- Step returns ---
    pub loop_ret: f64,
    pub lst_ret: f64,
    pub hedge_ret: f64,
    pub fund_ret: f64,

    // --- Exposures ---
    pub lst_cash: f64,
    pub hedge_cash: f64,
    pub lst_cash_end: f64,
    pub hedge_cash_end: f64,

    // --- P&L attribution ---
    pub lst_pnl: f64,
    pub hedge_pnl: f64,
    pub hedge_pnl_mark: f64,
    pub fund_pnl: f64,
    pub free_pnl: f64,
    /// Net of this step's fees.
    pub total_pnl: f64,

    // --- Costs ---
    pub lst_fees: f64,
    pub hedge_fees: f64,
    pub total_fees: f64,

    // --- Drift and derived ---
    pub capital_dev: f64,
    pub position_dev: f64,
    pub leverage: f64,
    pub strategy_ret: f64,
    pub strategy_cumret: f64,
}

impl SimulationRecord {
    /// Cash value of one primary unit on this bar.
    pub fn unit_value(&self) -> f64 {
        self.lst_price * self.cross_factor
    }
}

/// The emitted state table: row 0 from the initializer, the rest from the recurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub strategy_type: StrategyType,
    pub records: Vec<SimulationRecord>,
}

impl SimulationOutput {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn initial_capital(&self) -> Option<f64> {
        self.records.first().map(|r| r.capital)
    }

    pub fn final_capital(&self) -> Option<f64> {
        self.records.last().map(|r| r.capital)
    }

    pub fn rebalance_count(&self) -> usize {
        self.records.iter().filter(|r| r.rebalanced).count()
    }

    /// Sum of every fee charged, including the opening fees on row 0.
    pub fn total_fees(&self) -> f64 {
        self.records.iter().map(|r| r.total_fees).sum()
    }

    pub fn strategy_returns(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.records.iter().map(|r| (r.timestamp, r.strategy_ret)).collect()
    }

    pub fn equity_curve(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.records.iter().map(|r| (r.timestamp, r.capital)).collect()
    }
}
