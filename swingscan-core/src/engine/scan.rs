//! Rule scan and forward-gain backtest.
//!
//! One pass, left to right: every bar in the scan range is checked against
//! the entry rule; a match at `i` emits a signal entered at the next bar's
//! open and immediately simulates the hold from there. The signal bar itself
//! is never the entry.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::precompute::compute_indicators;
use super::simulate::simulate_gain;
use crate::components::indicator::IndicatorSet;
use crate::components::rule::{EntryRule, RuleError};
use crate::domain::Series;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("target gain must be a positive finite fraction (got {0})")]
    InvalidTargetGain(f64),

    #[error("max_hold_days must be >= 1")]
    ZeroHoldDays,

    #[error("unknown tail policy '{0}' (valid: full_window, truncate)")]
    UnknownTailPolicy(String),
}

/// How the scan treats the last bars of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Only trigger where a full `max_hold_days` window follows the entry.
    #[default]
    FullWindow,
    /// Trigger anywhere the entry bar exists; short windows near the end
    /// report not-hit if the target is not reached before the data runs out.
    Truncate,
}

impl FromStr for TailPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_window" | "full" => Ok(TailPolicy::FullWindow),
            "truncate" => Ok(TailPolicy::Truncate),
            other => Err(ConfigError::UnknownTailPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for TailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailPolicy::FullWindow => f.write_str("full_window"),
            TailPolicy::Truncate => f.write_str("truncate"),
        }
    }
}

/// Backtest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub rule: EntryRule,
    /// Fractional gain that counts as a hit (0.03 = 3%).
    pub target_gain: f64,
    pub max_hold_days: u32,
    #[serde(default)]
    pub tail_policy: TailPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            rule: EntryRule::swing(),
            target_gain: 0.03,
            max_hold_days: 14,
            tail_policy: TailPolicy::FullWindow,
        }
    }
}

impl BacktestConfig {
    pub fn with_rule(rule: EntryRule) -> Self {
        Self {
            rule,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rule.validate()?;
        if !(self.target_gain.is_finite() && self.target_gain > 0.0) {
            return Err(ConfigError::InvalidTargetGain(self.target_gain));
        }
        if self.max_hold_days == 0 {
            return Err(ConfigError::ZeroHoldDays);
        }
        Ok(())
    }
}

/// A rule match, entered on the following bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub trigger_index: usize,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
}

/// Signal plus its simulated hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub signal: Signal,
    pub hit: bool,
    /// First-touch day when hit, `max_hold_days` otherwise.
    pub days_to_hit: u32,
}

impl BacktestOutcome {
    /// Days to hit, only when the target was reached.
    pub fn hit_day(&self) -> Option<u32> {
        self.hit.then_some(self.days_to_hit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub ticker: String,
    pub total_signals: usize,
    pub hits: usize,
    pub success_rate: f64,
}

impl BacktestSummary {
    pub fn from_outcomes(ticker: &str, outcomes: &[BacktestOutcome]) -> Self {
        let total_signals = outcomes.len();
        let hits = outcomes.iter().filter(|o| o.hit).count();
        let success_rate = if total_signals == 0 {
            0.0
        } else {
            hits as f64 / total_signals as f64
        };
        Self {
            ticker: ticker.to_string(),
            total_signals,
            hits,
            success_rate,
        }
    }
}

/// Everything a presentation layer needs to tabulate or chart one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub summary: BacktestSummary,
    pub outcomes: Vec<BacktestOutcome>,
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// Trigger indices that were evaluated.
    pub scanned: Range<usize>,
}

/// Trigger indices the scan evaluates for a series of `bar_count` bars.
///
/// Empty when the series is shorter than the warm-up plus the tail.
pub fn scan_bounds(bar_count: usize, config: &BacktestConfig) -> Range<usize> {
    let start = config.rule.warmup_bars();
    let tail = match config.tail_policy {
        TailPolicy::FullWindow => config.max_hold_days as usize + 1,
        TailPolicy::Truncate => 1,
    };
    let end = bar_count.saturating_sub(tail);
    if end <= start {
        start..start
    } else {
        start..end
    }
}

/// Compute the rule's indicators over `series`, then scan.
pub fn run_scan(series: &Series, config: &BacktestConfig) -> ScanReport {
    let indicators = compute_indicators(series.bars(), &config.rule.required_indicators());
    scan_with_indicators(series, &indicators, config)
}

/// Scan with a caller-owned indicator set.
///
/// The set must hold the series named by `config.rule.required_indicators()`;
/// anything missing reads as NaN and never matches.
pub fn scan_with_indicators(
    series: &Series,
    indicators: &IndicatorSet,
    config: &BacktestConfig,
) -> ScanReport {
    let bars = series.bars();
    let scanned = scan_bounds(bars.len(), config);
    let mut outcomes = Vec::new();

    for i in scanned.clone() {
        if !config.rule.evaluate(bars, i, indicators) {
            continue;
        }
        let entry_index = i + 1;
        let Some(entry) = bars.get(entry_index) else {
            break;
        };

        let signal = Signal {
            trigger_index: i,
            entry_index,
            entry_date: entry.date,
            entry_price: entry.open,
        };
        let result = simulate_gain(bars, entry_index, config.target_gain, config.max_hold_days);
        debug!(
            ticker = %series.ticker,
            date = %signal.entry_date,
            entry_price = signal.entry_price,
            hit = result.hit,
            days = result.days,
            "signal"
        );
        outcomes.push(BacktestOutcome {
            signal,
            hit: result.hit,
            days_to_hit: result.days,
        });
    }

    ScanReport {
        summary: BacktestSummary::from_outcomes(&series.ticker, &outcomes),
        outcomes,
        bar_count: bars.len(),
        warmup_bars: config.rule.warmup_bars(),
        scanned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn default_config() {
        let c = BacktestConfig::default();
        assert_eq!(c.target_gain, 0.03);
        assert_eq!(c.max_hold_days, 14);
        assert_eq!(c.tail_policy, TailPolicy::FullWindow);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let mut c = BacktestConfig::default();
        c.target_gain = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidTargetGain(0.0)));
        let mut c = BacktestConfig::default();
        c.max_hold_days = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroHoldDays));
        let mut c = BacktestConfig::default();
        c.rule.fast = 30;
        assert!(matches!(c.validate(), Err(ConfigError::Rule(_))));
    }

    #[test]
    fn tail_policy_parse() {
        assert_eq!("truncate".parse::<TailPolicy>().unwrap(), TailPolicy::Truncate);
        assert_eq!("full".parse::<TailPolicy>().unwrap(), TailPolicy::FullWindow);
        assert!("none".parse::<TailPolicy>().is_err());
    }

    #[test]
    fn bounds_full_window_leave_room_for_the_hold() {
        // swing preset, 14-day hold: triggers 50..len-15
        let c = BacktestConfig::default();
        assert_eq!(scan_bounds(300, &c), 50..285);
    }

    #[test]
    fn bounds_truncate_stop_before_last_bar() {
        let c = BacktestConfig {
            tail_policy: TailPolicy::Truncate,
            ..BacktestConfig::default()
        };
        assert_eq!(scan_bounds(60, &c), 50..59);
    }

    #[test]
    fn bounds_empty_when_series_too_short() {
        let c = BacktestConfig::default();
        assert!(scan_bounds(60, &c).is_empty());
        assert!(scan_bounds(0, &c).is_empty());
    }

    #[test]
    fn short_series_yields_zero_signals() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = Series::from_sorted("TINY", make_bars(&closes));
        let report = run_scan(&series, &BacktestConfig::default());
        assert_eq!(report.summary.total_signals, 0);
        assert_eq!(report.summary.hits, 0);
        assert_eq!(report.summary.success_rate, 0.0);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn summary_guards_division_by_zero() {
        let s = BacktestSummary::from_outcomes("X", &[]);
        assert_eq!(s.success_rate, 0.0);
        assert!(!s.success_rate.is_nan());
    }

    #[test]
    fn hit_day_only_when_hit() {
        let signal = Signal {
            trigger_index: 0,
            entry_index: 1,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            entry_price: 10.0,
        };
        let hit = BacktestOutcome {
            signal: signal.clone(),
            hit: true,
            days_to_hit: 4,
        };
        let miss = BacktestOutcome {
            signal,
            hit: false,
            days_to_hit: 14,
        };
        assert_eq!(hit.hit_day(), Some(4));
        assert_eq!(miss.hit_day(), None);
    }
}
