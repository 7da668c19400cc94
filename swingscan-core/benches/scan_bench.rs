//! Criterion benchmarks for the scan hot paths.
//!
//! 1. Indicator precompute for the swing rule
//! 2. Full scan (precompute + rule + forward holds)
//! 3. Latest-bar screen

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use swingscan_core::domain::{Bar, Series};
use swingscan_core::engine::{compute_indicators, run_scan, screen_latest, BacktestConfig};
use swingscan_core::components::EntryRule;

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.05 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: close + 1.5,
                low: open - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500_000) as f64,
            }
        })
        .collect()
}

fn bench_precompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("precompute");
    let specs = EntryRule::swing().required_indicators();
    for n in [500, 2_500, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| compute_indicators(black_box(bars), &specs))
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let config = BacktestConfig::default();
    for n in [500, 2_500, 10_000] {
        let series = Series::from_sorted("BENCH", make_bars(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, series| {
            b.iter(|| run_scan(black_box(series), &config))
        });
    }
    group.finish();
}

fn bench_screen(c: &mut Criterion) {
    let series = Series::from_sorted("BENCH", make_bars(2_500));
    let rule = EntryRule::trend();
    c.bench_function("screen_latest_2500", |b| {
        b.iter(|| screen_latest(black_box(&series), &rule))
    });
}

criterion_group!(benches, bench_precompute, bench_scan, bench_screen);
criterion_main!(benches);
