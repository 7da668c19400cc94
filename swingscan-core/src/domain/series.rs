//! Series: an ordered run of daily bars for one ticker.

use super::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("bar {index} ({date}) is earlier than the bar before it")]
    Unordered { index: usize, date: NaiveDate },

    #[error("duplicate bar for {date} at index {index}")]
    Duplicate { index: usize, date: NaiveDate },
}

/// Bars for a single ticker, dates strictly increasing.
///
/// Gaps (weekends, holidays) are allowed. The engines borrow a `Series`
/// read-only; nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub ticker: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series, rejecting out-of-order or duplicate dates.
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (i, pair) in bars.windows(2).enumerate() {
            let index = i + 1;
            let date = pair[1].date;
            if pair[1].date == pair[0].date {
                return Err(SeriesError::Duplicate { index, date });
            }
            if pair[1].date < pair[0].date {
                return Err(SeriesError::Unordered { index, date });
            }
        }
        Ok(Self::from_sorted(ticker, bars))
    }

    /// Build a series without checking the date invariant.
    ///
    /// The caller guarantees dates are strictly increasing.
    pub fn from_sorted(ticker: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn accepts_increasing_dates_with_gaps() {
        let s = Series::new("SPY", vec![bar(2, 1.0), bar(3, 2.0), bar(8, 3.0)]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(s.last_date(), NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_eq!(s.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = Series::new("SPY", vec![bar(2, 1.0), bar(2, 2.0)]).unwrap_err();
        assert!(matches!(err, SeriesError::Duplicate { index: 1, .. }));
    }

    #[test]
    fn rejects_unordered_dates() {
        let err = Series::new("SPY", vec![bar(3, 1.0), bar(2, 2.0)]).unwrap_err();
        assert!(matches!(err, SeriesError::Unordered { index: 1, .. }));
    }

    #[test]
    fn empty_series_is_valid() {
        let s = Series::new("SPY", vec![]).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.first_date(), None);
    }
}
