//! Synthetic hourly series shared by the engine integration tests.

#![allow(dead_code)]

use backtester::BacktestParams;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{ColumnMap, InputFrame, StrategyType};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn columns() -> ColumnMap {
    ColumnMap {
        lst_price: "ethx_close".into(),
        lst_return: "ethx_ret".into(),
        hedge_price: "eth_fut_close".into(),
        hedge_return: "eth_fut_ret".into(),
        funding: "funding_1h".into(),
        cross_price: None,
    }
}

pub fn params(strategy_type: StrategyType, deviation: f64) -> BacktestParams {
    BacktestParams::new(columns(), strategy_type, deviation, 10_000.0, 0.0004, 0.0005)
}

/// Name of the primary/hedge-asset exchange rate column used for cross scaling.
pub const CROSS: &str = "ethx_eth";

pub fn cross_columns() -> ColumnMap {
    ColumnMap {
        cross_price: Some(CROSS.into()),
        ..columns()
    }
}

/// `params` with cross scaling on: the cross factor is `max(1, 0.1 * cross price)`.
pub fn cross_params(strategy_type: StrategyType, deviation: f64) -> BacktestParams {
    BacktestParams::new(cross_columns(), strategy_type, deviation, 10_000.0, 0.0004, 0.0005)
        .with_cross_cap(0.1)
}

pub fn hourly(n: usize) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n).map(|h| start + Duration::hours(h as i64)).collect()
}

/// Builds a frame from `(primary, hedge, funding)` rows; returns are simple returns
/// of consecutive prices, with 0 on the first row.
pub fn frame_from_rows(rows: &[(f64, f64, f64)]) -> InputFrame {
    let returns = |pick: fn(&(f64, f64, f64)) -> f64| -> Vec<Option<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if i == 0 {
                    Some(0.0)
                } else {
                    Some(pick(row) / pick(&rows[i - 1]) - 1.0)
                }
            })
            .collect()
    };

    InputFrame::new(hourly(rows.len()))
        .with_column("ethx_close", rows.iter().map(|r| Some(r.0)).collect())
        .unwrap()
        .with_column("ethx_ret", returns(|r| r.0))
        .unwrap()
        .with_column("eth_fut_close", rows.iter().map(|r| Some(r.1)).collect())
        .unwrap()
        .with_column("eth_fut_ret", returns(|r| r.1))
        .unwrap()
        .with_column("funding_1h", rows.iter().map(|r| Some(r.2)).collect())
        .unwrap()
}

/// A deterministic, gently oscillating market where the primary slowly outgrows the hedge.
pub fn wavy_frame(n: usize) -> InputFrame {
    let rows: Vec<(f64, f64, f64)> = (0..n)
        .map(|t| {
            let t = t as f64;
            let lst = 100.0 * (1.0 + 0.03 * (t / 5.0).sin()) * (1.0 + 0.0002 * t);
            let hedge = 50.0 * (1.0 + 0.028 * (t / 5.0 + 0.3).sin());
            let funding = 0.0001 + 0.00005 * (t / 7.0).cos();
            (lst, hedge, funding)
        })
        .collect();
    frame_from_rows(&rows)
}

/// `wavy_frame` plus a cross price swinging around 11, so the cross factor moves
/// between roughly 1.05 and 1.15 from bar to bar.
pub fn cross_wavy_frame(n: usize) -> InputFrame {
    let cross: Vec<Option<f64>> = (0..n)
        .map(|t| Some(11.0 + 0.5 * (t as f64 / 3.0).sin()))
        .collect();
    wavy_frame(n).with_column(CROSS, cross).unwrap()
}
