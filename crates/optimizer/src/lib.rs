//! # Hedgeloop Optimizer
//!
//! Runs one backtest and one report per point of a parameter grid, in parallel.
//! Every run borrows the same input frame; a failing run is recorded next to
//! the successful ones instead of aborting the sweep.

use crate::generator::{ParameterSet, apply_parameters, generate_parameter_sets};
use analytics::{AnalyticsEngine, MetricParams, PerformanceReport};
use backtester::{BacktestParams, Backtester};
use configuration::optimizer_config::OptimizerConfig;
use configuration::settings::Config;
use core_types::InputFrame;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub mod error;
pub mod generator;

pub use error::OptimizerError;

/// The result of one grid point.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub parameters: JsonValue,
    /// The report, or the error that stopped this run.
    pub result: Result<PerformanceReport, String>,
}

impl RunOutcome {
    pub fn report(&self) -> Option<&PerformanceReport> {
        self.result.as_ref().ok()
    }
}

pub struct Optimizer {
    job_id: Uuid,
    config: OptimizerConfig,
    base_config: Config,
    metrics: MetricParams,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, base_config: Config) -> Result<Self, OptimizerError> {
        let metrics = MetricParams::try_from(&base_config.metrics)?;
        Ok(Self {
            job_id: Uuid::new_v4(),
            config,
            base_config,
            metrics,
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Runs the whole grid against `frame`. Outcomes keep the grid order.
    pub fn run(&self, frame: &InputFrame) -> Result<Vec<RunOutcome>, OptimizerError> {
        let param_sets = generate_parameter_sets(&self.config)?;
        let total_runs = param_sets.len();
        let threads = self.config.threads.unwrap_or_else(num_cpus::get);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| OptimizerError::ThreadPool(e.to_string()))?;

        tracing::info!(
            job_id = %self.job_id,
            runs = total_runs,
            threads,
            "Starting parameter sweep"
        );

        let progress_bar = ProgressBar::new(total_runs as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )?
                .progress_chars("=>-"),
        );

        let outcomes: Vec<RunOutcome> = pool.install(|| {
            param_sets
                .into_par_iter()
                .map(|set| {
                    let outcome = self.execute_single_backtest(frame, set);
                    progress_bar.inc(1);
                    outcome
                })
                .collect()
        });

        progress_bar.finish_with_message("Optimization runs complete.");

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(
            job_id = %self.job_id,
            completed = total_runs - failed,
            failed,
            "Parameter sweep complete"
        );
        Ok(outcomes)
    }

    fn execute_single_backtest(&self, frame: &InputFrame, set: ParameterSet) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let result = self.evaluate(frame, &set).map_err(|e| {
            tracing::warn!(%run_id, parameters = ?set, error = %e, "Backtest run failed");
            e.to_string()
        });
        RunOutcome {
            run_id,
            parameters: JsonValue::Object(set),
            result,
        }
    }

    fn evaluate(
        &self,
        frame: &InputFrame,
        set: &ParameterSet,
    ) -> Result<PerformanceReport, OptimizerError> {
        let config = apply_parameters(&self.base_config, set)?;
        let params = BacktestParams::try_from(&config)?;
        let output = Backtester::new(params)?.run(frame)?;
        Ok(AnalyticsEngine::new().calculate(&output, &self.metrics)?)
    }
}
