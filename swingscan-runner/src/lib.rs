//! SwingScan Runner: configuration, data loading, multi-ticker runs, export.
//!
//! This crate builds on `swingscan-core` to provide:
//! - TOML run configuration (tickers, date range, rule preset and overrides)
//! - Paced, failure-tolerant bar loading with synthetic fallback
//! - Parallel per-ticker backtests and latest-bar screens
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, ProviderKind, RunConfig};
pub use data_loader::{load_for_config, load_series, synthetic_series, LoadError, LoadReport};
pub use runner::{
    backtest_loaded, execute_backtest, execute_screen, run_backtests, run_screen, screen_loaded,
    BacktestRun, RunError, ScreenRun, TickerBacktest, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_config_is_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn run_results_are_send_sync() {
        assert_send::<BacktestRun>();
        assert_sync::<BacktestRun>();
        assert_send::<ScreenRun>();
        assert_sync::<ScreenRun>();
    }

    #[test]
    fn load_report_is_send_sync() {
        assert_send::<LoadReport>();
        assert_sync::<LoadReport>();
    }
}
