//! Property tests for indicator and backtest invariants.
//!
//! 1. RSI stays inside [0, 100]
//! 2. EMA seed equals the simple average of the first `period` closes
//! 3. EMA of a constant series is that constant
//! 4. A hold on strictly rising closes hits no later than a flat one
//! 5. Outcome counts always reconcile with the summary

use chrono::NaiveDate;
use proptest::prelude::*;
use swingscan_core::components::Indicator;
use swingscan_core::domain::{Bar, Series};
use swingscan_core::engine::{run_scan, simulate_gain, BacktestConfig};
use swingscan_core::indicators::{ema_of_series, Ema, Rsi};

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 500.0,
            }
        })
        .collect()
}

fn arb_closes(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, len)
}

proptest! {
    #[test]
    fn rsi_is_bounded(closes in arb_closes(20..200)) {
        let values = Rsi::new(14).compute(&bars_from_closes(&closes));
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v), "rsi out of range: {v}");
        }
    }

    #[test]
    fn ema_seed_is_simple_average(closes in arb_closes(60..120), period in 2usize..50) {
        let values = ema_of_series(&closes, period);
        let sma = closes[..period].iter().sum::<f64>() / period as f64;
        prop_assert!((values[period - 1] - sma).abs() < 1e-9);
        prop_assert!(values[..period - 1].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_of_constant_is_constant(level in 1.0..1000.0_f64, period in 1usize..30) {
        let bars = bars_from_closes(&vec![level; 80]);
        let values = Ema::new(period).compute(&bars);
        for v in &values[period - 1..] {
            prop_assert!((v - level).abs() < 1e-9);
        }
    }

    #[test]
    fn rising_hold_hits_within_window(step in 0.5..5.0_f64) {
        // open of bar 1 is 100; close climbs by `step` each day
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + step * i as f64).collect();
        let bars = bars_from_closes(&closes);
        let r = simulate_gain(&bars, 1, 0.03, 14);
        let needed = (3.0 / step).ceil() as u32;
        if needed <= 14 {
            prop_assert!(r.hit);
            prop_assert!(r.days <= needed);
        }
    }

    #[test]
    fn summary_reconciles(closes in arb_closes(80..250)) {
        let series = Series::new("RND", bars_from_closes(&closes)).unwrap();
        let report = run_scan(&series, &BacktestConfig::default());
        let hits = report.outcomes.iter().filter(|o| o.hit).count();
        prop_assert_eq!(report.summary.total_signals, report.outcomes.len());
        prop_assert_eq!(report.summary.hits, hits);
        prop_assert!((0.0..=1.0).contains(&report.summary.success_rate));
        for o in &report.outcomes {
            prop_assert!(report.scanned.contains(&o.signal.trigger_index));
            if !o.hit {
                prop_assert_eq!(o.days_to_hit, 14);
            }
        }
    }
}
