//! Signal & backtest engine.
//!
//! - `precompute`: run every requested indicator once over the series
//! - `simulate`: forward-hold simulation for one entry
//! - `scan`: left-to-right rule scan, one simulation per match, summary
//! - `screen`: rule evaluated on the latest bar only

pub mod precompute;
pub mod scan;
pub mod screen;
pub mod simulate;

pub use precompute::{compute_indicators, compute_warmup};
pub use scan::{
    run_scan, scan_bounds, scan_with_indicators, BacktestConfig, BacktestOutcome,
    BacktestSummary, ConfigError, ScanReport, Signal, TailPolicy,
};
pub use screen::{screen_latest, ScreenMatch};
pub use simulate::{simulate_gain, GainResult};
