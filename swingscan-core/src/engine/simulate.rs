//! Forward-hold simulation for a single entry.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Outcome of one simulated hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainResult {
    pub hit: bool,
    /// Day of first touch when `hit`, otherwise `max_hold_days`.
    pub days: u32,
}

/// Buy at `open[entry_index]` and watch closes for up to `max_hold_days`.
///
/// Stops at the first close whose gain over the entry price reaches
/// `target_gain` (first-touch; no search for a better exit). Running past the
/// end of the bars counts as not hit, with `days = max_hold_days`.
pub fn simulate_gain(
    bars: &[Bar],
    entry_index: usize,
    target_gain: f64,
    max_hold_days: u32,
) -> GainResult {
    let miss = GainResult {
        hit: false,
        days: max_hold_days,
    };

    let Some(entry) = bars.get(entry_index) else {
        return miss;
    };
    let entry_price = entry.open;

    for day in 1..=max_hold_days {
        let Some(bar) = bars.get(entry_index + day as usize) else {
            break;
        };
        let gain = (bar.close - entry_price) / entry_price;
        if gain >= target_gain {
            return GainResult { hit: true, days: day };
        }
    }

    miss
}
