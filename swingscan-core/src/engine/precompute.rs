//! Indicator precomputation.
//!
//! All indicators are computed once before the scan begins. Each one keeps
//! its running state local to its own `compute` call, so nothing carries over
//! between series or between threads.

use crate::components::indicator::IndicatorSet;
use crate::domain::Bar;
use crate::indicators::IndicatorSpec;

/// Compute every requested indicator over `bars`.
///
/// Duplicate requests are computed once.
pub fn compute_indicators(bars: &[Bar], specs: &[IndicatorSpec]) -> IndicatorSet {
    let mut set = IndicatorSet::new();
    for spec in specs {
        let name = spec.name();
        if set.get_series(&name).is_some() {
            continue;
        }
        let indicator = spec.build();
        let series = indicator.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            indicator.name(),
            series.len(),
            bars.len()
        );
        set.insert(name, series);
    }
    set
}

/// Maximum lookback across a set of indicator requests.
pub fn compute_warmup(specs: &[IndicatorSpec]) -> usize {
    specs.iter().map(|s| s.lookback()).max().unwrap_or(0)
}
