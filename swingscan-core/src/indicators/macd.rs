//! Moving Average Convergence Divergence (MACD).
//!
//! Three outputs (separate Indicator instances):
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal), seeded on the first `signal` defined line values
//! - Histogram: line - signal
//!
//! Lookback: line = max(fast, slow) - 1; signal and histogram add `signal - 1`.
//! With the usual 12/26/9 the signal line is first defined at index 33.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

use super::ema::ema_of_series;

/// Which MACD output to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdOutput {
    Line,
    Signal,
    Histogram,
}

impl MacdOutput {
    fn prefix(&self) -> &'static str {
        match self {
            MacdOutput::Line => "macd_line",
            MacdOutput::Signal => "macd_signal",
            MacdOutput::Histogram => "macd_hist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, output: MacdOutput) -> Self {
        assert!(
            fast >= 1 && slow >= 1 && signal >= 1,
            "MACD periods must be >= 1"
        );
        Self {
            fast,
            slow,
            signal,
            output,
            name: macd_name(output, fast, slow, signal),
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Signal)
    }

    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdOutput::Histogram)
    }

    fn line_lookback(&self) -> usize {
        self.fast.max(self.slow) - 1
    }
}

/// `IndicatorSet` key for one MACD output.
pub fn macd_name(output: MacdOutput, fast: usize, slow: usize, signal: usize) -> String {
    format!("{}_{fast}_{slow}_{signal}", output.prefix())
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.output {
            MacdOutput::Line => self.line_lookback(),
            MacdOutput::Signal | MacdOutput::Histogram => self.line_lookback() + self.signal - 1,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        if self.output == MacdOutput::Line {
            return line;
        }

        // The signal EMA starts where the line does; before that it is warm-up.
        let start = self.line_lookback().min(line.len());
        let mut signal = vec![f64::NAN; start];
        signal.extend(ema_of_series(&line[start..], self.signal));

        match self.output {
            MacdOutput::Signal => signal,
            _ => line.iter().zip(&signal).map(|(l, s)| l - s).collect(),
        }
    }
}
