//! Latest-bar screen: does the rule hold on the most recent session?

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::precompute::compute_indicators;
use crate::components::rule::{EntryRule, RuleInputs};
use crate::domain::Series;

/// Snapshot of the rule inputs on the last bar of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenMatch {
    pub ticker: String,
    pub date: NaiveDate,
    pub inputs: RuleInputs,
    pub qualified: bool,
}

/// Evaluate `rule` on the last bar of `series`.
///
/// `None` for an empty series. A series too short for the rule's indicators
/// still returns a snapshot (with NaN inputs) that does not qualify.
pub fn screen_latest(series: &Series, rule: &EntryRule) -> Option<ScreenMatch> {
    let bars = series.bars();
    let last = bars.len().checked_sub(1)?;
    let indicators = compute_indicators(bars, &rule.required_indicators());
    let inputs = rule.inputs(bars, last, &indicators);
    Some(ScreenMatch {
        ticker: series.ticker.clone(),
        date: bars[last].date,
        qualified: rule.matches(&inputs),
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn empty_series_has_no_snapshot() {
        let series = Series::from_sorted("NONE", vec![]);
        assert!(screen_latest(&series, &EntryRule::swing()).is_none());
    }

    #[test]
    fn short_series_does_not_qualify() {
        let series = Series::from_sorted("SHORT", make_bars(&[10.0, 11.0, 12.0]));
        let m = screen_latest(&series, &EntryRule::swing()).unwrap();
        assert!(!m.qualified);
        assert!(m.inputs.has_nan());
        assert_eq!(m.inputs.close, 12.0);
    }

    #[test]
    fn snapshot_is_taken_on_last_bar() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.2).sin()).collect();
        let bars = make_bars(&closes);
        let last_date = bars[79].date;
        let series = Series::from_sorted("WAVE", bars);
        let m = screen_latest(&series, &EntryRule::swing()).unwrap();
        assert_eq!(m.date, last_date);
        assert_eq!(m.ticker, "WAVE");
        assert!(!m.inputs.has_nan());
    }
}
