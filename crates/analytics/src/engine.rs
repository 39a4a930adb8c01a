use crate::error::AnalyticsError;
use crate::report::{BenchmarkRatios, PerformanceReport, PnlAttribution};
use crate::returns::{self, compound, mean, sample_std};
use backtester::{SimulationOutput, SimulationRecord};
use configuration::MetricsSettings;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Share of the worst returns averaged into the expected shortfall.
const SHORTFALL_TAIL: f64 = 0.05;

/// Numeric metric parameters, converted once from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricParams {
    pub periods_per_year: f64,
    /// Annual rate; divided by `periods_per_year` per observation.
    pub risk_free_rate: f64,
    /// Named annual reference rates, each reported with its own Sharpe and Sortino.
    pub benchmarks: Vec<(String, f64)>,
    pub resample_daily: bool,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            periods_per_year: 365.0,
            risk_free_rate: 0.0,
            benchmarks: Vec::new(),
            resample_daily: true,
        }
    }
}

impl TryFrom<&MetricsSettings> for MetricParams {
    type Error = AnalyticsError;

    fn try_from(settings: &MetricsSettings) -> Result<Self, Self::Error> {
        let benchmarks = settings
            .benchmarks
            .iter()
            .map(|(name, rate)| rate_to_f64(name, *rate).map(|r| (name.clone(), r)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            periods_per_year: f64::from(settings.periods_per_year),
            risk_free_rate: rate_to_f64("risk_free_rate", settings.risk_free_rate)?,
            benchmarks,
            resample_daily: settings.resample_daily,
        })
    }
}

fn rate_to_f64(name: &str, rate: Decimal) -> Result<f64, AnalyticsError> {
    rate.to_f64().ok_or_else(|| {
        AnalyticsError::InvalidSettings(format!("{} rate {} does not fit a float", name, rate))
    })
}

/// A stateless calculator for deriving performance metrics from a run's state table.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// With `resample_daily` the ratios use one compounded return per UTC day,
    /// otherwise the per-step returns. `periods_per_year` must match the choice.
    pub fn calculate(
        &self,
        output: &SimulationOutput,
        params: &MetricParams,
    ) -> Result<PerformanceReport, AnalyticsError> {
        let records = output.records.as_slice();
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Err(AnalyticsError::NotEnoughData("the output has no rows".to_string()));
        };
        if !(params.periods_per_year.is_finite() && params.periods_per_year > 0.0) {
            return Err(AnalyticsError::InvalidSettings(format!(
                "periods_per_year must be positive, got {}",
                params.periods_per_year
            )));
        }
        if first.capital <= 0.0 {
            return Err(AnalyticsError::Calculation(format!(
                "opening capital must be positive, got {}",
                first.capital
            )));
        }

        let dated = if params.resample_daily {
            returns::daily_returns(records)
        } else {
            returns::step_returns(records)
        };
        let series: Vec<f64> = dated.iter().map(|(_, r)| *r).collect();
        let monthly = returns::monthly_returns(&dated);
        let weights = if params.resample_daily {
            returns::daily_closes(records, |r| r.leverage)
        } else {
            records.iter().map(|r| (r.timestamp.date_naive(), r.leverage)).collect()
        };

        let periods = params.periods_per_year;
        let (sharpe_ratio, sortino_ratio) = self.ratios(&series, periods, params.risk_free_rate);
        let benchmarks = params
            .benchmarks
            .iter()
            .map(|(name, rate)| {
                let (sharpe_ratio, sortino_ratio) = self.ratios(&series, periods, *rate);
                BenchmarkRatios {
                    name: name.clone(),
                    rate: *rate,
                    sharpe_ratio,
                    sortino_ratio,
                }
            })
            .collect();
        let report = PerformanceReport {
            observations: series.len(),
            periods_per_year: params.periods_per_year,
            total_return: compound(series.iter().copied()),
            mean_monthly_return: mean(&monthly),
            best_month: monthly.iter().copied().reduce(f64::max),
            worst_month: monthly.iter().copied().reduce(f64::min),
            sharpe_ratio,
            sortino_ratio,
            benchmarks,
            annualized_volatility: sample_std(&series).map(|s| s * params.periods_per_year.sqrt()),
            max_drawdown: returns::max_drawdown(&series),
            expected_shortfall_95: returns::expected_shortfall(&series, SHORTFALL_TAIL),
            attribution: self.attribution(records),
            rebalance_count: output.rebalance_count(),
            monthly_turnover: returns::monthly_turnover(&weights),
            mean_leverage: records.iter().map(|r| r.leverage).sum::<f64>() / records.len() as f64,
            max_leverage: records.iter().map(|r| r.leverage).fold(f64::MIN, f64::max),
            total_fees: output.total_fees(),
            initial_capital: first.capital,
            final_capital: last.capital,
        };

        tracing::debug!(
            policy = %output.strategy_type,
            observations = report.observations,
            total_return = report.total_return,
            sharpe = ?report.sharpe_ratio,
            "Calculated performance report"
        );
        Ok(report)
    }

    /// Annualized Sharpe and Sortino ratios of the returns in excess of an annual `rate`.
    fn ratios(&self, series: &[f64], periods: f64, rate: f64) -> (Option<f64>, Option<f64>) {
        let rf = rate / periods;
        let excess: Vec<f64> = series.iter().map(|r| r - rf).collect();
        let Some(mean_excess) = mean(&excess) else {
            return (None, None);
        };

        let sharpe = sample_std(&excess)
            .filter(|std| *std > 0.0)
            .map(|std| periods.sqrt() * mean_excess / std);

        let downside_var =
            excess.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / excess.len() as f64;
        let downside = downside_var.sqrt() * periods.sqrt();
        let sortino = (downside > 0.0).then(|| mean_excess * periods / downside);

        (sharpe, sortino)
    }

    /// Compounds each component's per-step share of the previous capital.
    fn attribution(&self, records: &[SimulationRecord]) -> PnlAttribution {
        let mut growth = PnlAttribution {
            spot: 1.0,
            hedge: 1.0,
            funding: 1.0,
            fees: 1.0,
        };
        if let Some(first) = records.first() {
            // Opening fees are not deducted from capital, so they are measured against it.
            growth.fees *= 1.0 - first.total_fees / first.capital;
        }
        for w in records.windows(2) {
            let (prev, r) = (&w[0], &w[1]);
            growth.spot *= 1.0 + r.lst_pnl / prev.capital;
            growth.hedge *= 1.0 + r.hedge_pnl / prev.capital;
            growth.funding *= 1.0 + r.fund_pnl / prev.capital;
            growth.fees *= 1.0 - r.total_fees / prev.capital;
        }
        PnlAttribution {
            spot: growth.spot - 1.0,
            hedge: growth.hedge - 1.0,
            funding: growth.funding - 1.0,
            fees: growth.fees - 1.0,
        }
    }
}
