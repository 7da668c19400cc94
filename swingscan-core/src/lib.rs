//! SwingScan Core: indicators, entry rule, signal scan and forward-gain backtest.
//!
//! This crate contains the engine:
//! - Domain types (bars, series)
//! - Indicator trait, EMA / MACD / RSI, precomputed `IndicatorSet`
//! - Entry rule predicate (EMA stack + MACD + RSI band)
//! - Single-pass scan with next-bar-open entries and bounded forward holds
//! - Latest-bar screen
//! - Data providers (Polygon, CSV) feeding normalised series into the engine
//!
//! The engine performs no I/O; only `data` talks to the outside world.

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross thread boundaries, so callers
    /// may scan tickers on separate workers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();

        require_send::<components::IndicatorSet>();
        require_sync::<components::IndicatorSet>();
        require_send::<components::EntryRule>();
        require_sync::<components::EntryRule>();

        require_send::<engine::BacktestConfig>();
        require_sync::<engine::BacktestConfig>();
        require_send::<engine::ScanReport>();
        require_sync::<engine::ScanReport>();
        require_send::<engine::ScreenMatch>();
        require_sync::<engine::ScreenMatch>();

        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::RequestPacer>();
        require_sync::<data::RequestPacer>();
    }

    /// The rule sees bars and indicators only; this documents the signature.
    #[test]
    fn rule_evaluation_takes_no_future_context() {
        fn _check(
            rule: &components::EntryRule,
            bars: &[domain::Bar],
            indicators: &components::IndicatorSet,
        ) -> bool {
            rule.evaluate(bars, 0, indicators)
        }
    }
}
