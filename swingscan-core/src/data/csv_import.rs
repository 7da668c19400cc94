//! Offline provider: one CSV file per ticker.
//!
//! Files live at `{dir}/{TICKER}.csv` with a header row
//! `date,open,high,low,close,volume` and ISO dates.

use super::normalize::normalize;
use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_uppercase()))
    }
}

/// Read every bar in a CSV file, in file order.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let bar: Bar = record?;
        bars.push(bar);
    }
    Ok(bars)
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                ticker: ticker.to_string(),
            });
        }

        let mut bars = read_bars(&path)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        let normalized = normalize(ticker, bars);
        tracing::debug!(
            ticker,
            path = %path.display(),
            bars = normalized.series.len(),
            dropped = normalized.dropped(),
            "loaded CSV bars"
        );

        Ok(FetchResult {
            dropped: normalized.dropped(),
            series: normalized.series,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("SPY.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-04,101,103,100,102,1500\n\
             2024-01-02,100,101,99,100.5,1000\n\
             2024-01-03,100.5,102,100,101,1200\n\
             2024-01-03,100.5,102,100,101.5,1300\n\
             2024-02-01,110,111,109,110,900\n",
        )
        .unwrap();
    }

    #[test]
    fn loads_sorted_deduped_in_range() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let provider = CsvProvider::new(tmp.path());

        let result = provider.fetch("spy", date(1, 1), date(1, 31)).unwrap();
        assert_eq!(result.source, DataSource::CsvImport);
        assert_eq!(result.series.len(), 3);
        assert_eq!(result.series.closes(), vec![100.5, 101.5, 102.0]);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.series.first_date(), Some(date(1, 2)));
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(tmp.path());
        assert!(provider.is_available());
        assert!(matches!(
            provider.fetch("QQQ", date(1, 1), date(12, 31)),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-02,abc,1,1,1,1\n",
        )
        .unwrap();
        let provider = CsvProvider::new(tmp.path());
        assert!(matches!(
            provider.fetch("BAD", date(1, 1), date(12, 31)),
            Err(DataError::Csv(_))
        ));
    }
}
