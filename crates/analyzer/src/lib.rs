use crate::error::AnalyzerError;
use analytics::PerformanceReport;
use configuration::optimizer_config::{AnalysisConfig, RankMetric};
use optimizer::RunOutcome;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

pub mod error;

/// A report that includes the raw performance data, the parameters that produced it,
/// and the value it was ranked by.
#[derive(Debug, Clone, Serialize)]
pub struct RankedReport {
    pub run_id: Uuid,
    pub parameters: Value,
    pub score: f64,
    pub report: PerformanceReport,
}

/// The main analysis engine.
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Filters and ranks the outcomes of a sweep, keeping the configured top N.
    ///
    /// Failed runs and runs whose ranking metric is undefined are dropped.
    pub fn rank(&self, outcomes: &[RunOutcome]) -> Result<Vec<RankedReport>, AnalyzerError> {
        // 1. Keep completed runs
        let completed: Vec<(&RunOutcome, &PerformanceReport)> =
            outcomes.iter().filter_map(|o| o.report().map(|r| (o, r))).collect();
        if completed.is_empty() {
            return Err(AnalyzerError::NoRunsFound);
        }

        // 2. Filter
        let max_drawdown = self.config.filters.max_drawdown_pct.to_f64().ok_or_else(|| {
            AnalyzerError::InvalidSettings(format!(
                "max_drawdown_pct {} does not fit a float",
                self.config.filters.max_drawdown_pct
            ))
        })? / 100.0;
        let filtered = completed.into_iter().filter(|(_, r)| {
            r.max_drawdown <= max_drawdown
                && r.rebalance_count >= self.config.filters.min_rebalances
        });

        // 3. Score
        let rank_by = self.config.ranking.rank_by;
        let mut ranked: Vec<RankedReport> = filtered
            .filter_map(|(outcome, report)| {
                metric(report, rank_by).map(|score| RankedReport {
                    run_id: outcome.run_id,
                    parameters: outcome.parameters.clone(),
                    score,
                    report: report.clone(),
                })
            })
            .collect();

        // 4. Rank
        ranked.sort_by(|a, b| {
            let order = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
            if self.config.ranking.ascending { order } else { order.reverse() }
        });
        ranked.truncate(self.config.ranking.top_n);

        tracing::debug!(kept = ranked.len(), metric = ?rank_by, "Ranked sweep outcomes");
        Ok(ranked)
    }
}

/// The value of `metric` for one report; `None` when the metric is undefined.
pub fn metric(report: &PerformanceReport, metric: RankMetric) -> Option<f64> {
    let value = match metric {
        RankMetric::Sharpe => report.sharpe_ratio,
        RankMetric::Sortino => report.sortino_ratio,
        RankMetric::TotalReturn => Some(report.total_return),
        RankMetric::MaxDrawdown => Some(report.max_drawdown),
        RankMetric::Volatility => report.annualized_volatility,
        RankMetric::MonthlyReturn => report.mean_monthly_return,
        RankMetric::FinalCapital => Some(report.final_capital),
        RankMetric::Cvar => report.expected_shortfall_95,
    };
    value.filter(|v| v.is_finite())
}
