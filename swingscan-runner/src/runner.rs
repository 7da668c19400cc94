//! Run orchestration: load bars, scan every ticker, collect results.
//!
//! Entry points:
//! - `run_backtests()` / `run_screen()`: pre-loaded series, no I/O. Tickers
//!   are scanned in parallel; results come back in input order.
//! - `execute_backtest()` / `execute_screen()`: load from the configured
//!   provider first. Used by the CLI.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use swingscan_core::components::rule::{EntryRule, RuleError};
use swingscan_core::data::DataSource;
use swingscan_core::domain::Series;
use swingscan_core::engine::{
    run_scan, screen_latest, BacktestConfig, BacktestSummary, ScanReport, ScreenMatch,
};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_for_config, LoadError, LoadFailure, LoadReport};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("invalid backtest settings: {0}")]
    Backtest(#[from] swingscan_core::engine::ConfigError),
    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Scan result for one ticker, with data provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerBacktest {
    pub ticker: String,
    pub source: DataSource,
    pub dataset_hash: String,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub report: ScanReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTicker {
    pub ticker: String,
    pub reason: String,
}

impl From<&LoadFailure> for FailedTicker {
    fn from(f: &LoadFailure) -> Self {
        Self {
            ticker: f.ticker.clone(),
            reason: f.reason.clone(),
        }
    }
}

/// Complete result of a multi-ticker backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: BacktestConfig,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub has_synthetic: bool,
    pub results: Vec<TickerBacktest>,
    pub failures: Vec<FailedTicker>,
}

impl BacktestRun {
    /// Per-ticker summaries in input order. Tickers are never pooled.
    pub fn summaries(&self) -> impl Iterator<Item = &BacktestSummary> {
        self.results.iter().map(|r| &r.report.summary)
    }
}

/// Latest-bar screen over a watch list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenRun {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub rule: EntryRule,
    pub has_synthetic: bool,
    pub snapshots: Vec<ScreenMatch>,
    pub failures: Vec<FailedTicker>,
}

impl ScreenRun {
    /// Tickers whose latest bar satisfies the rule, in watch-list order.
    pub fn qualified(&self) -> Vec<&str> {
        self.snapshots
            .iter()
            .filter(|s| s.qualified)
            .map(|s| s.ticker.as_str())
            .collect()
    }
}

/// Scan each series independently. Output order matches input order.
pub fn run_backtests(series: &[Series], config: &BacktestConfig) -> Result<Vec<ScanReport>, RunError> {
    config.validate()?;
    let reports: Vec<ScanReport> = series.par_iter().map(|s| run_scan(s, config)).collect();
    for r in &reports {
        info!(
            ticker = %r.summary.ticker,
            bars = r.bar_count,
            signals = r.summary.total_signals,
            hits = r.summary.hits,
            success_rate = r.summary.success_rate,
            "backtest complete"
        );
    }
    Ok(reports)
}

/// Evaluate the rule on the last bar of each series. Empty series are skipped.
pub fn run_screen(series: &[Series], rule: &EntryRule) -> Result<Vec<ScreenMatch>, RunError> {
    rule.validate()?;
    let snapshots: Vec<ScreenMatch> = series
        .par_iter()
        .filter_map(|s| screen_latest(s, rule))
        .collect();
    for m in &snapshots {
        info!(
            ticker = %m.ticker,
            date = %m.date,
            close = m.inputs.close,
            ema_fast = m.inputs.ema_fast,
            ema_mid = m.inputs.ema_mid,
            ema_slow = m.inputs.ema_slow,
            macd = m.inputs.macd,
            macd_signal = m.inputs.macd_signal,
            rsi = m.inputs.rsi,
            qualified = m.qualified,
            "latest values"
        );
    }
    Ok(snapshots)
}

/// Backtest pre-loaded data.
pub fn backtest_loaded(
    loaded: &LoadReport,
    config: &BacktestConfig,
    run_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<BacktestRun, RunError> {
    let reports = run_backtests(&loaded.series(), config)?;
    let results = loaded
        .loaded
        .iter()
        .zip(reports)
        .map(|(l, report)| TickerBacktest {
            ticker: l.series.ticker.clone(),
            source: l.source,
            dataset_hash: l.dataset_hash.clone(),
            first_date: l.series.first_date(),
            last_date: l.series.last_date(),
            report,
        })
        .collect();

    Ok(BacktestRun {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        start_date,
        end_date,
        has_synthetic: loaded.has_synthetic(),
        results,
        failures: loaded.failures.iter().map(FailedTicker::from).collect(),
    })
}

/// Screen pre-loaded data.
pub fn screen_loaded(loaded: &LoadReport, rule: &EntryRule) -> Result<ScreenRun, RunError> {
    let snapshots = run_screen(&loaded.series(), rule)?;
    Ok(ScreenRun {
        schema_version: SCHEMA_VERSION,
        rule: rule.clone(),
        has_synthetic: loaded.has_synthetic(),
        snapshots,
        failures: loaded.failures.iter().map(FailedTicker::from).collect(),
    })
}

/// Load from the configured provider, then backtest every ticker.
///
/// The loaded bars come back alongside the run so callers can chart them.
pub fn execute_backtest(config: &RunConfig) -> Result<(BacktestRun, LoadReport), RunError> {
    let backtest = config.backtest_config()?;
    let loaded = load_for_config(config)?;
    let run = backtest_loaded(&loaded, &backtest, config.run_id(), config.start, config.end_or_today())?;
    Ok((run, loaded))
}

/// Load from the configured provider, then screen every ticker.
pub fn execute_screen(config: &RunConfig) -> Result<(ScreenRun, LoadReport), RunError> {
    let rule = config.entry_rule()?;
    let loaded = load_for_config(config)?;
    let run = screen_loaded(&loaded, &rule)?;
    info!(
        qualified = ?run.qualified(),
        screened = run.snapshots.len(),
        "screen complete"
    );
    Ok((run, loaded))
}
