//! # Hedgeloop Strategy Engine
//!
//! A single forward pass over an aligned price/funding series that carries the looped
//! position, the short hedge and the capital between steps. Step `t` reads only the
//! state left by step `t - 1` and the bar at `t`.

use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use core_types::{CoreError, InputFrame, MarketBar};
use std::time::Instant;
use strategies::{RebalanceCadence, RebalancePolicy, StepContext, create_policy};

pub mod error;
pub mod params;
pub mod record;

pub use params::{BacktestParams, HEDGE_WEIGHT, LST_WEIGHT};
pub use record::{SimulationOutput, SimulationRecord};

/// Hedge units that offset `count_loop` primary units at the given prices.
pub fn hedge_units(count_loop: f64, unit_value: f64, hedge_price: f64) -> f64 {
    count_loop * (unit_value / hedge_price)
}

/// The backtesting engine for one parameter set.
///
/// The engine owns its policy and never mutates the input frame, so a single frame can
/// be shared by many engines running in parallel.
pub struct Backtester {
    params: BacktestParams,
    policy: Box<dyn RebalancePolicy>,
    cadence: Option<RebalanceCadence>,
}

impl Backtester {
    /// Validates the parameters and builds the policy and cadence they describe.
    pub fn new(params: BacktestParams) -> Result<Self, BacktestError> {
        params.validate()?;
        let policy = create_policy(params.strategy_type, params.deviation)?;
        let cadence = params
            .rebalance_hours
            .map(|hours| RebalanceCadence::new(hours, params.start_hour))
            .transpose()?;

        Ok(Self {
            params,
            policy,
            cadence,
        })
    }

    pub fn params(&self) -> &BacktestParams {
        &self.params
    }

    /// Runs the simulation over the mapped columns of `frame`.
    pub fn run(&self, frame: &InputFrame) -> Result<SimulationOutput, BacktestError> {
        let bars = frame.bars(&self.params.columns)?;
        self.run_bars(&bars)
    }

    /// Runs the simulation over already aligned bars.
    pub fn run_bars(&self, bars: &[MarketBar]) -> Result<SimulationOutput, BacktestError> {
        let first = bars.first().ok_or(BacktestError::DataUnavailable)?;
        for bar in bars {
            self.check_prices(bar)?;
        }

        let started = Instant::now();
        tracing::info!(
            policy = %self.policy.kind(),
            deviation = self.params.deviation,
            rebalance_hours = ?self.params.rebalance_hours,
            bars = bars.len(),
            from = %first.timestamp,
            "Starting backtest run"
        );

        let mut records = Vec::with_capacity(bars.len());
        records.push(self.initialize(first));
        let capital_0 = self.params.initial_capital;

        for bar in &bars[1..] {
            let prev = &records[records.len() - 1];
            let record = self.step(prev, bar, capital_0)?;
            records.push(record);
        }

        let output = SimulationOutput {
            strategy_type: self.policy.kind(),
            records,
        };

        tracing::info!(
            policy = %output.strategy_type,
            final_capital = output.final_capital().unwrap_or(capital_0),
            rebalances = output.rebalance_count(),
            total_fees = output.total_fees(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backtest run complete"
        );
        Ok(output)
    }

    /// Opening state: the target split is bought on the first bar.
    ///
    /// Opening fees are charged on the whole initial capital for both legs and are
    /// reported without being deducted from `capital_0`.
    fn initialize(&self, bar: &MarketBar) -> SimulationRecord {
        let p = &self.params;
        let capital = p.initial_capital;
        let cross = self.cross_factor(bar);
        let unit_value = bar.lst_price * cross;

        let count_loop = capital * p.deploy_ratio() / cross / bar.lst_price;
        let count_hedge = hedge_units(count_loop, unit_value, bar.hedge_price);
        let lst_cash = count_loop * unit_value;
        let hedge_cash = count_hedge * bar.hedge_price;

        let lst_fees = capital * p.spot_fee + capital * (p.cross_cap.max(0.0) * p.spot_fee);
        let hedge_fees = capital * p.fut_fee;

        SimulationRecord {
            timestamp: bar.timestamp,
            lst_price: bar.lst_price,
            hedge_price: bar.hedge_price,
            cross_factor: cross,
            capital,
            count_loop,
            count_hedge,
            diff_lst: 0.0,
            diff_hedge: 0.0,
            cum_pnl: 0.0,
            rebalanced: false,
            loop_ret: 0.0,
            lst_ret: 0.0,
            hedge_ret: 0.0,
            fund_ret: 0.0,
            lst_cash,
            hedge_cash,
            lst_cash_end: lst_cash,
            hedge_cash_end: hedge_cash,
            lst_pnl: 0.0,
            hedge_pnl: 0.0,
            hedge_pnl_mark: 0.0,
            fund_pnl: 0.0,
            free_pnl: 0.0,
            total_pnl: 0.0,
            lst_fees,
            hedge_fees,
            total_fees: lst_fees + hedge_fees,
            capital_dev: 0.0,
            position_dev: 0.0,
            leverage: lst_cash / capital,
            strategy_ret: 0.0,
            strategy_cumret: 1.0,
        }
    }

    /// Advances the state by one bar.
    fn step(
        &self,
        prev: &SimulationRecord,
        bar: &MarketBar,
        capital_0: f64,
    ) -> Result<SimulationRecord, BacktestError> {
        let p = &self.params;
        let ratio = p.hedge_ratio();
        let cross = self.cross_factor(bar);
        let unit_value = bar.lst_price * cross;

        // --- 1. Returns ---
        let loop_ret = bar.lst_return;
        let fund_ret = bar.funding_rate * ratio;
        let hedge_ret = -bar.hedge_return * ratio;
        let lst_ret = loop_ret * p.deploy_ratio();

        // --- 2. P&L on the previous position at current prices ---
        let hedge_notional = prev.count_hedge * prev.hedge_price;
        let lst_pnl = prev.count_loop * unit_value - prev.count_loop * prev.unit_value();
        let fund_pnl = hedge_notional * fund_ret;
        let hedge_pnl = hedge_notional * -bar.hedge_return;
        let hedge_pnl_mark = hedge_notional - prev.count_hedge * bar.hedge_price;
        let free_pnl = hedge_pnl + fund_pnl;
        let gross_pnl = lst_pnl + hedge_pnl + fund_pnl;

        // --- 3. Drift ---
        let lst_cash = prev.count_loop * unit_value;
        let hedge_cash = prev.count_hedge * bar.hedge_price;
        let mut cum_pnl = prev.cum_pnl + free_pnl;
        let capital_dev = cum_pnl / capital_0;
        if !hedge_cash.is_finite() || hedge_cash <= 0.0 {
            return Err(BacktestError::DegenerateHedge {
                timestamp: bar.timestamp.to_rfc3339(),
                value: hedge_cash,
            });
        }
        let position_dev = lst_cash / hedge_cash - 1.0;

        // --- 4. Rebalance decision ---
        let ctx = StepContext {
            capital_dev,
            position_dev,
            cum_pnl,
            total_pnl: gross_pnl,
            unit_value,
            due: self.is_due(bar),
        };
        let decision = self.policy.decide(&ctx);
        if decision.consumes_buffer {
            cum_pnl = 0.0;
        }
        if decision.rebalance {
            tracing::debug!(
                timestamp = %bar.timestamp,
                diff_lst = decision.diff_lst,
                capital_dev,
                position_dev,
                due = ctx.due,
                "Rebalancing looped position"
            );
        }

        // --- 5. Apply the trade; the hedge follows the primary leg ---
        let count_loop = prev.count_loop + decision.diff_lst;
        let count_hedge = hedge_units(count_loop, unit_value, bar.hedge_price);
        let diff_hedge = count_hedge - prev.count_hedge;

        // --- 6. Fees ---
        let lst_fees = (decision.diff_lst * unit_value * p.spot_fee).abs();
        let hedge_fees = (diff_hedge * bar.hedge_price * p.fut_fee).abs();
        let total_fees = lst_fees + hedge_fees;

        // --- 7. Capital ---
        let total_pnl = gross_pnl - total_fees;
        let capital = prev.capital + total_pnl;

        // --- 8. Derived outputs ---
        let lst_cash_end = count_loop * unit_value;
        let hedge_cash_end = count_hedge * bar.hedge_price;
        let leverage = lst_cash_end / capital;
        let strategy_ret = capital / prev.capital - 1.0;

        for (field, value) in [
            ("capital", capital),
            ("leverage", leverage),
            ("strategy_ret", strategy_ret),
        ] {
            ensure_finite(field, value, bar.timestamp)?;
        }

        tracing::trace!(
            timestamp = %bar.timestamp,
            capital,
            count_loop,
            count_hedge,
            cum_pnl,
            total_pnl,
            "Step complete"
        );

        Ok(SimulationRecord {
            timestamp: bar.timestamp,
            lst_price: bar.lst_price,
            hedge_price: bar.hedge_price,
            cross_factor: cross,
            capital,
            count_loop,
            count_hedge,
            diff_lst: decision.diff_lst,
            diff_hedge,
            cum_pnl,
            rebalanced: decision.rebalance,
            loop_ret,
            lst_ret,
            hedge_ret,
            fund_ret,
            lst_cash,
            hedge_cash,
            lst_cash_end,
            hedge_cash_end,
            lst_pnl,
            hedge_pnl,
            hedge_pnl_mark,
            fund_pnl,
            free_pnl,
            total_pnl,
            lst_fees,
            hedge_fees,
            total_fees,
            capital_dev,
            position_dev,
            leverage,
            strategy_ret,
            strategy_cumret: capital / capital_0,
        })
    }

    fn is_due(&self, bar: &MarketBar) -> bool {
        self.cadence.is_some_and(|c| c.is_due(&bar.local_time))
    }

    fn cross_factor(&self, bar: &MarketBar) -> f64 {
        match bar.cross_price {
            Some(price) => (self.params.cross_cap * price).max(1.0),
            None => 1.0,
        }
    }

    fn check_prices(&self, bar: &MarketBar) -> Result<(), BacktestError> {
        let columns = &self.params.columns;
        let mut checks = vec![
            (columns.lst_price.as_str(), bar.lst_price),
            (columns.hedge_price.as_str(), bar.hedge_price),
        ];
        if let (Some(name), Some(price)) = (&columns.cross_price, bar.cross_price) {
            checks.push((name.as_str(), price));
        }

        for (column, price) in checks {
            if !price.is_finite() || price <= 0.0 {
                return Err(CoreError::InvalidInput(
                    column.to_string(),
                    format!("price must be positive, got {} at {}", price, bar.timestamp),
                )
                .into());
            }
        }
        Ok(())
    }
}

fn ensure_finite(
    field: &'static str,
    value: f64,
    timestamp: DateTime<Utc>,
) -> Result<(), BacktestError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BacktestError::NonFinite {
            field,
            value,
            timestamp: timestamp.to_rfc3339(),
        })
    }
}
