//! Entry rule: EMA stack + MACD momentum + RSI band, evaluated on one bar.
//!
//! ```text
//! close > EMA_fast > EMA_mid > EMA_slow
//! AND MACD line > MACD signal
//! AND rsi_low < RSI < rsi_high
//! ```
//!
//! The rule reads only bar `i` and indicator values at `i`. It never sees the
//! entry bar or anything after it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::indicator::IndicatorSet;
use crate::domain::Bar;
use crate::indicators::IndicatorSpec;

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("indicator periods must be >= 1")]
    ZeroPeriod,

    #[error("EMA periods must be strictly increasing (got fast={fast}, mid={mid}, slow={slow})")]
    EmaOrder { fast: usize, mid: usize, slow: usize },

    #[error("RSI band is empty (low={low}, high={high})")]
    EmptyRsiBand { low: f64, high: f64 },

    #[error("unknown rule preset '{0}' (valid: swing, trend)")]
    UnknownPreset(String),
}

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePreset {
    /// EMA 8/21/50: single-ticker backtest settings.
    #[default]
    Swing,
    /// EMA 20/50/200: watch-list screener settings.
    Trend,
}

impl RulePreset {
    pub fn rule(self) -> EntryRule {
        match self {
            RulePreset::Swing => EntryRule::swing(),
            RulePreset::Trend => EntryRule::trend(),
        }
    }
}

impl FromStr for RulePreset {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swing" => Ok(RulePreset::Swing),
            "trend" => Ok(RulePreset::Trend),
            other => Err(RuleError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for RulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePreset::Swing => f.write_str("swing"),
            RulePreset::Trend => f.write_str("trend"),
        }
    }
}

/// Entry rule parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRule {
    pub fast: usize,
    pub mid: usize,
    pub slow: usize,
    pub rsi_period: usize,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for EntryRule {
    fn default() -> Self {
        Self::swing()
    }
}

/// Inputs the rule reads at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleInputs {
    pub close: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub rsi: f64,
}

impl RuleInputs {
    pub fn has_nan(&self) -> bool {
        [
            self.close,
            self.ema_fast,
            self.ema_mid,
            self.ema_slow,
            self.macd,
            self.macd_signal,
            self.rsi,
        ]
        .iter()
        .any(|v| v.is_nan())
    }
}

impl EntryRule {
    pub fn swing() -> Self {
        Self {
            fast: 8,
            mid: 21,
            slow: 50,
            rsi_period: 14,
            rsi_low: 55.0,
            rsi_high: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }

    pub fn trend() -> Self {
        Self {
            fast: 20,
            mid: 50,
            slow: 200,
            ..Self::swing()
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        let periods = [
            self.fast,
            self.mid,
            self.slow,
            self.rsi_period,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
        ];
        if periods.contains(&0) {
            return Err(RuleError::ZeroPeriod);
        }
        if !(self.fast < self.mid && self.mid < self.slow) {
            return Err(RuleError::EmaOrder {
                fast: self.fast,
                mid: self.mid,
                slow: self.slow,
            });
        }
        if self.rsi_low.is_nan() || self.rsi_high.is_nan() || self.rsi_low >= self.rsi_high {
            return Err(RuleError::EmptyRsiBand {
                low: self.rsi_low,
                high: self.rsi_high,
            });
        }
        Ok(())
    }

    fn ema_fast_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Ema { period: self.fast }
    }

    fn ema_mid_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Ema { period: self.mid }
    }

    fn ema_slow_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Ema { period: self.slow }
    }

    fn rsi_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Rsi {
            period: self.rsi_period,
        }
    }

    fn macd_line_spec(&self) -> IndicatorSpec {
        IndicatorSpec::MacdLine {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    fn macd_signal_spec(&self) -> IndicatorSpec {
        IndicatorSpec::MacdSignal {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    /// Indicators the rule reads, in a stable order.
    pub fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            self.ema_fast_spec(),
            self.ema_mid_spec(),
            self.ema_slow_spec(),
            self.macd_line_spec(),
            self.macd_signal_spec(),
            self.rsi_spec(),
        ]
    }

    /// First bar index the scan evaluates.
    ///
    /// The slow EMA period or the longest indicator lookback, whichever is
    /// larger: 50 for the swing preset.
    pub fn warmup_bars(&self) -> usize {
        let max_lookback = self
            .required_indicators()
            .iter()
            .map(|s| s.lookback())
            .max()
            .unwrap_or(0);
        max_lookback.max(self.slow)
    }

    /// Gather the rule inputs at `bar_index`. Missing values come back as NaN.
    pub fn inputs(&self, bars: &[Bar], bar_index: usize, indicators: &IndicatorSet) -> RuleInputs {
        let at = |spec: IndicatorSpec| indicators.value(&spec.name(), bar_index);
        RuleInputs {
            close: bars.get(bar_index).map_or(f64::NAN, |b| b.close),
            ema_fast: at(self.ema_fast_spec()),
            ema_mid: at(self.ema_mid_spec()),
            ema_slow: at(self.ema_slow_spec()),
            macd: at(self.macd_line_spec()),
            macd_signal: at(self.macd_signal_spec()),
            rsi: at(self.rsi_spec()),
        }
    }

    /// Apply the predicate to already-gathered inputs.
    pub fn matches(&self, x: &RuleInputs) -> bool {
        if x.has_nan() {
            return false;
        }
        x.close > x.ema_fast
            && x.ema_fast > x.ema_mid
            && x.ema_mid > x.ema_slow
            && x.macd > x.macd_signal
            && self.rsi_low < x.rsi
            && x.rsi < self.rsi_high
    }

    /// Evaluate the rule at `bar_index`.
    pub fn evaluate(&self, bars: &[Bar], bar_index: usize, indicators: &IndicatorSet) -> bool {
        self.matches(&self.inputs(bars, bar_index, indicators))
    }
}
