use serde::{Deserialize, Serialize};

/// A standardized report of one run's performance.
///
/// Ratios that are undefined for the given returns (too few observations,
/// zero dispersion) are `None` rather than NaN or infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Number of return observations the ratios were computed over.
    pub observations: usize,
    pub periods_per_year: f64,

    // I. Returns
    pub total_return: f64,
    pub mean_monthly_return: Option<f64>,
    pub best_month: Option<f64>,
    pub worst_month: Option<f64>,

    // II. Risk
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    /// Sharpe and Sortino against each configured reference rate, ordered by name.
    pub benchmarks: Vec<BenchmarkRatios>,
    pub annualized_volatility: Option<f64>,
    /// Largest peak-to-trough loss of the compounded returns, as a fraction.
    pub max_drawdown: f64,
    /// Historical expected shortfall at 95%: mean of the worst 5% of returns.
    pub expected_shortfall_95: Option<f64>,

    // III. Attribution
    pub attribution: PnlAttribution,

    // IV. Exposure and costs
    pub rebalance_count: usize,
    /// Mean per-period absolute change in leverage, averaged within and then across months.
    pub monthly_turnover: Option<f64>,
    pub mean_leverage: f64,
    pub max_leverage: f64,
    pub total_fees: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
}

/// Compounded contribution of each P&L component, each step measured against
/// the previous step's capital. Fees are reported as a negative contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlAttribution {
    pub spot: f64,
    pub hedge: f64,
    pub funding: f64,
    pub fees: f64,
}

/// Risk-adjusted ratios against one named reference rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRatios {
    pub name: String,
    /// Annual rate.
    pub rate: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
}
