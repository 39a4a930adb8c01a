use analytics::{AnalyticsEngine, MetricParams, PerformanceReport};
use analyzer::{Analyzer, RankedReport};
use anyhow::Context;
use backtester::{BacktestParams, Backtester};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{RunOverrides, init_tracing, load_config, load_optimizer_config};
use optimizer::Optimizer;
use std::path::PathBuf;

/// The main entry point for the hedgeloop backtester.
fn main() -> anyhow::Result<()> {
    // A .env file is optional; it only seeds HEDGELOOP__* overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Run(args) => handle_run(args),
        Commands::Sweep(args) => handle_sweep(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Backtests a looped-collateral position hedged with a short perpetual.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest and print its performance report.
    Run(RunArgs),
    /// Run a parameter sweep and print the ranked results.
    Sweep(SweepArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the run configuration.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Write the full state table here (.parquet, anything else is CSV).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: RunOverrides,
}

#[derive(Parser)]
struct SweepArgs {
    /// Path to the base run configuration.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the sweep definition.
    #[arg(long)]
    optimizer: PathBuf,

    /// Print the ranked results as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.apply_overrides(&args.overrides);
    config.validate()?;
    let _guard = init_tracing(&config.logging)?;
    tracing::info!(
        config = %args.config.display(),
        policy = %config.rebalance.strategy_type,
        "Loaded configuration"
    );

    let frame = datastore::load_frame(&config.data.input_path, &config.data.timestamp_column)
        .with_context(|| format!("reading {}", config.data.input_path.display()))?;

    let params = BacktestParams::try_from(&config)?;
    let output = Backtester::new(params)?.run(&frame)?;
    let metrics = MetricParams::try_from(&config.metrics)?;
    let report = AnalyticsEngine::new().calculate(&output, &metrics)?;

    if let Some(path) = &args.output {
        datastore::write_output(path, &output)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report_table(&config.rebalance.strategy_type.to_string(), &report));
    }
    Ok(())
}

fn handle_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let sweep = load_optimizer_config(&args.optimizer)
        .with_context(|| format!("loading {}", args.optimizer.display()))?;
    let _guard = init_tracing(&config.logging)?;

    let frame = datastore::load_frame(&config.data.input_path, &config.data.timestamp_column)
        .with_context(|| format!("reading {}", config.data.input_path.display()))?;

    let analyzer = Analyzer::new(sweep.analysis.clone());
    let optimizer = Optimizer::new(sweep, config)?;
    let outcomes = optimizer.run(&frame)?;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    let ranked = analyzer.rank(&outcomes)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        println!("{}", ranking_table(&ranked));
        println!(
            "Job {}: {} runs, {} failed, {} shown.",
            optimizer.job_id(),
            outcomes.len(),
            failed,
            ranked.len()
        );
    }
    Ok(())
}

// ==============================================================================
// Output
// ==============================================================================

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn opt_pct(value: Option<f64>) -> String {
    value.map(pct).unwrap_or_else(|| "n/a".to_string())
}

fn opt_ratio(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn report_table(policy: &str, report: &PerformanceReport) -> Table {
    let a = &report.attribution;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", policy]);
    for (name, value) in [
        ("Total return", pct(report.total_return)),
        ("Sharpe ratio", opt_ratio(report.sharpe_ratio)),
        ("Sortino ratio", opt_ratio(report.sortino_ratio)),
        ("Volatility (ann.)", opt_pct(report.annualized_volatility)),
        ("Max drawdown", pct(report.max_drawdown)),
        ("Expected shortfall 95%", opt_pct(report.expected_shortfall_95)),
        ("Mean monthly return", opt_pct(report.mean_monthly_return)),
        ("Best month", opt_pct(report.best_month)),
        ("Worst month", opt_pct(report.worst_month)),
        ("Spot contribution", pct(a.spot)),
        ("Hedge contribution", pct(a.hedge)),
        ("Funding contribution", pct(a.funding)),
        ("Fee contribution", pct(a.fees)),
        ("Rebalances", report.rebalance_count.to_string()),
        ("Monthly turnover", opt_ratio(report.monthly_turnover)),
        ("Mean leverage", format!("{:.2}x", report.mean_leverage)),
        ("Max leverage", format!("{:.2}x", report.max_leverage)),
        ("Total fees", format!("{:.2}", report.total_fees)),
        ("Final capital", format!("{:.2}", report.final_capital)),
    ] {
        table.add_row(vec![name.to_string(), value]);
    }
    for b in &report.benchmarks {
        let label = format!("{} ({})", b.name, pct(b.rate));
        table.add_row(vec![format!("Sharpe vs {}", label), opt_ratio(b.sharpe_ratio)]);
        table.add_row(vec![format!("Sortino vs {}", label), opt_ratio(b.sortino_ratio)]);
    }
    table
}

fn ranking_table(ranked: &[RankedReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "#", "Parameters", "Score", "Return", "Sharpe", "Max DD", "Rebalances", "Fees",
    ]);
    for (i, r) in ranked.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            r.parameters.to_string(),
            format!("{:.4}", r.score),
            pct(r.report.total_return),
            opt_ratio(r.report.sharpe_ratio),
            pct(r.report.max_drawdown),
            r.report.rebalance_count.to_string(),
            format!("{:.2}", r.report.total_fees),
        ]);
    }
    table
}
