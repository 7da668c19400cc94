//! Indicator trait and precomputed indicator values container.
//!
//! Indicators are pure functions: bar history in, numeric series out.
//! They are precomputed once before the scan and looked up per bar.
//! No recomputation on each bar.

use crate::domain::Bar;
use std::collections::HashMap;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warm-up).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Name used as the `IndicatorSet` key (e.g., "ema_8", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Container for precomputed indicator series, aligned 1:1 with the bars.
///
/// Built once before the scan, then queried by bar index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Get the indicator value at a specific bar index.
    ///
    /// `None` when the name is unknown or the index is out of range; a warm-up
    /// value comes back as `Some(NAN)`.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    /// Like [`get`](Self::get), but folds "missing" into the NaN sentinel.
    pub fn value(&self, name: &str, bar_index: usize) -> f64 {
        self.get(name, bar_index).unwrap_or(f64::NAN)
    }

    /// Get the full series for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Names of all stored series, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_set_insert_and_get() {
        let mut set = IndicatorSet::new();
        set.insert(
            "ema_20",
            vec![f64::NAN; 19]
                .into_iter()
                .chain(vec![100.0, 101.0])
                .collect(),
        );
        assert!(set.get("ema_20", 0).unwrap().is_nan());
        assert_eq!(set.get("ema_20", 19), Some(100.0));
        assert_eq!(set.get("ema_20", 20), Some(101.0));
        assert_eq!(set.get("ema_20", 21), None); // out of bounds
    }

    #[test]
    fn missing_name_folds_to_nan() {
        let set = IndicatorSet::new();
        assert_eq!(set.get("nonexistent", 0), None);
        assert!(set.value("nonexistent", 0).is_nan());
    }

    #[test]
    fn names_are_sorted() {
        let mut set = IndicatorSet::new();
        assert!(set.is_empty());
        set.insert("rsi_14", vec![1.0, 2.0]);
        set.insert("ema_8", vec![1.0, 2.0]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["ema_8", "rsi_14"]);
    }
}
