//! # Hedgeloop Analytics Engine
//!
//! Turns the emitted state table of a run into a [`PerformanceReport`]: risk
//! adjusted ratios, drawdown, calendar-month figures, tail risk, and a P&L
//! attribution across the spot, hedge, funding and fee components.
//!
//! The engine is a stateless calculator. It never looks at the input series,
//! only at what the backtester produced.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
pub mod returns;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, MetricParams};
pub use error::AnalyticsError;
pub use report::{BenchmarkRatios, PerformanceReport, PnlAttribution};
