//! Normalisation: sort, dedupe, drop void rows, build a `Series`.

use crate::domain::{Bar, Series};

/// A normalised series plus what was thrown away to get it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub series: Series,
    pub dropped_duplicates: usize,
    pub dropped_void: usize,
}

impl Normalized {
    pub fn dropped(&self) -> usize {
        self.dropped_duplicates + self.dropped_void
    }
}

/// Sort by date, keep the last bar for each date, drop bars with NaN fields.
pub fn normalize(ticker: &str, mut bars: Vec<Bar>) -> Normalized {
    let before = bars.len();
    bars.retain(|b| !b.is_void());
    let dropped_void = before - bars.len();

    // Stable sort keeps provider order within a date, so "last" is the
    // provider's latest revision.
    bars.sort_by_key(|b| b.date);
    let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => deduped.push(bar),
        }
    }
    let dropped_duplicates = before - dropped_void - deduped.len();

    Normalized {
        series: Series::from_sorted(ticker, deduped),
        dropped_duplicates,
        dropped_void,
    }
}
