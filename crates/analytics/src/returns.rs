//! Return series helpers: resampling, compounding and simple statistics.

use backtester::SimulationRecord;
use chrono::{Datelike, NaiveDate};

/// The last value of `field` on each UTC calendar day.
pub fn daily_closes(
    records: &[SimulationRecord],
    field: impl Fn(&SimulationRecord) -> f64,
) -> Vec<(NaiveDate, f64)> {
    let mut closes: Vec<(NaiveDate, f64)> = Vec::new();
    for r in records {
        let day = r.timestamp.date_naive();
        match closes.last_mut() {
            Some((last_day, close)) if *last_day == day => *close = field(r),
            _ => closes.push((day, field(r))),
        }
    }
    closes
}

/// One return per UTC calendar day, from the last capital of each day.
///
/// The first day is measured against the opening capital of row 0.
pub fn daily_returns(records: &[SimulationRecord]) -> Vec<(NaiveDate, f64)> {
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let closes = daily_closes(records, |r| r.capital);
    let mut prev = first.capital;
    closes
        .into_iter()
        .map(|(day, close)| {
            let ret = close / prev - 1.0;
            prev = close;
            (day, ret)
        })
        .collect()
}

/// Per-step returns, skipping the opening row.
pub fn step_returns(records: &[SimulationRecord]) -> Vec<(NaiveDate, f64)> {
    records
        .iter()
        .skip(1)
        .map(|r| (r.timestamp.date_naive(), r.strategy_ret))
        .collect()
}

/// `prod(1 + r) - 1`
pub fn compound<I: IntoIterator<Item = f64>>(returns: I) -> f64 {
    returns.into_iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Compounded return of each calendar month, in chronological order.
pub fn monthly_returns(returns: &[(NaiveDate, f64)]) -> Vec<f64> {
    let mut months: Vec<((i32, u32), f64)> = Vec::new();
    for (day, r) in returns {
        let key = (day.year(), day.month());
        match months.last_mut() {
            Some((last, growth)) if *last == key => *growth *= 1.0 + r,
            _ => months.push((key, 1.0 + r)),
        }
    }
    months.into_iter().map(|(_, growth)| growth - 1.0).collect()
}

/// Average absolute period-to-period change of `weights`, first within each calendar
/// month and then across months. The first period counts as no change.
pub fn monthly_turnover(weights: &[(NaiveDate, f64)]) -> Option<f64> {
    let mut months: Vec<((i32, u32), Vec<f64>)> = Vec::new();
    let mut prev: Option<f64> = None;
    for (day, w) in weights {
        let change = prev.map_or(0.0, |p| (w - p).abs());
        prev = Some(*w);
        let key = (day.year(), day.month());
        match months.last_mut() {
            Some((last, changes)) if *last == key => changes.push(change),
            _ => months.push((key, vec![change])),
        }
    }
    let means: Vec<f64> = months.iter().filter_map(|(_, c)| mean(c)).collect();
    mean(&means)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 in the denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Largest fall from a running peak of the compounded curve, starting from 1.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        peak = f64::max(peak, equity);
        worst = worst.max((peak - equity) / peak);
    }
    worst
}

/// Mean of the worst `tail` share of returns; at least one observation.
pub fn expected_shortfall(returns: &[f64], tail: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);
    let count = ((tail * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
    mean(&sorted[..count])
}
