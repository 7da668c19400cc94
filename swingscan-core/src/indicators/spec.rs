//! Indicator requests: kind + period, turned into concrete indicators.

use serde::{Deserialize, Serialize};

use super::{macd_name, Ema, Macd, MacdOutput, Rsi};
use crate::components::indicator::Indicator;

/// A requested indicator, identified by kind and period(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Ema {
        period: usize,
    },
    Rsi {
        period: usize,
    },
    MacdLine {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdSignal {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdHistogram {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorSpec {
    /// The `IndicatorSet` key this request is stored under.
    pub fn name(&self) -> String {
        match *self {
            IndicatorSpec::Ema { period } => super::ema_name(period),
            IndicatorSpec::Rsi { period } => super::rsi_name(period),
            IndicatorSpec::MacdLine { fast, slow, signal } => {
                macd_name(MacdOutput::Line, fast, slow, signal)
            }
            IndicatorSpec::MacdSignal { fast, slow, signal } => {
                macd_name(MacdOutput::Signal, fast, slow, signal)
            }
            IndicatorSpec::MacdHistogram { fast, slow, signal } => {
                macd_name(MacdOutput::Histogram, fast, slow, signal)
            }
        }
    }

    /// Instantiate the concrete indicator.
    ///
    /// Panics on zero periods, like the indicator constructors themselves.
    pub fn build(&self) -> Box<dyn Indicator> {
        match *self {
            IndicatorSpec::Ema { period } => Box::new(Ema::new(period)),
            IndicatorSpec::Rsi { period } => Box::new(Rsi::new(period)),
            IndicatorSpec::MacdLine { fast, slow, signal } => {
                Box::new(Macd::line(fast, slow, signal))
            }
            IndicatorSpec::MacdSignal { fast, slow, signal } => {
                Box::new(Macd::signal(fast, slow, signal))
            }
            IndicatorSpec::MacdHistogram { fast, slow, signal } => {
                Box::new(Macd::histogram(fast, slow, signal))
            }
        }
    }

    pub fn lookback(&self) -> usize {
        self.build().lookback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_name_matches_built_indicator() {
        let specs = [
            IndicatorSpec::Ema { period: 21 },
            IndicatorSpec::Rsi { period: 14 },
            IndicatorSpec::MacdLine { fast: 12, slow: 26, signal: 9 },
            IndicatorSpec::MacdSignal { fast: 12, slow: 26, signal: 9 },
            IndicatorSpec::MacdHistogram { fast: 12, slow: 26, signal: 9 },
        ];
        for spec in specs {
            assert_eq!(spec.name(), spec.build().name());
        }
    }

    #[test]
    fn spec_lookbacks() {
        assert_eq!(IndicatorSpec::Ema { period: 50 }.lookback(), 49);
        assert_eq!(IndicatorSpec::Rsi { period: 14 }.lookback(), 14);
        assert_eq!(
            IndicatorSpec::MacdSignal { fast: 12, slow: 26, signal: 9 }.lookback(),
            33
        );
    }

    #[test]
    fn spec_serde_tagged() {
        let json = serde_json::to_string(&IndicatorSpec::Ema { period: 8 }).unwrap();
        assert_eq!(json, r#"{"kind":"ema","period":8}"#);
        let back: IndicatorSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IndicatorSpec::Ema { period: 8 });
    }
}
