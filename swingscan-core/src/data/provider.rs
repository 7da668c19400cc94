//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Polygon aggregates, CSV
//! files) so we can swap implementations and mock for tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Series;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and log lines.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("missing API key: set the {env_var} environment variable")]
    MissingApiKey { env_var: String },

    #[error("symbol not found: {ticker}")]
    SymbolNotFound { ticker: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Polygon,
    CsvImport,
    Synthetic,
}

/// Result of a successful data fetch for a single ticker.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series: Series,
    pub source: DataSource,
    /// Bars dropped during normalisation (duplicates, void rows).
    pub dropped: usize,
}

/// Trait for data providers (Polygon, CSV import, etc).
///
/// Implementations handle the specifics of fetching data from a particular
/// source and return a normalised, date-ordered series.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a ticker over an inclusive date range.
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
