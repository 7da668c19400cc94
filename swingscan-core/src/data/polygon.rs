//! Polygon.io aggregates provider.
//!
//! Fetches adjusted daily bars from `/v2/aggs/ticker/{ticker}/range/1/day/...`.
//! Retries transient failures with exponential backoff and shares a circuit
//! breaker across requests. Pacing between tickers is the caller's concern
//! (see `RequestPacer`).

use super::circuit_breaker::CircuitBreaker;
use super::normalize::normalize;
use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_API_KEY_ENV: &str = "POLYGON_API_KEY";

/// Connection settings. The API key is always passed in explicitly.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound on bars per request.
    pub limit: u32,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            limit: 50_000,
        }
    }

    /// Read the key from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, DataError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(DataError::MissingApiKey {
                env_var: var.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    status: Option<String>,
    #[serde(default)]
    results: Option<Vec<AggregateBar>>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Window start, milliseconds since the Unix epoch.
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
}

pub struct PolygonProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    config: ProviderConfig,
}

impl PolygonProvider {
    pub fn new(config: ProviderConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            config,
        })
    }

    fn aggregates_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{base}/v2/aggs/ticker/{ticker}/range/1/day/{start}/{end}\
             ?adjusted=true&sort=asc&limit={limit}&apiKey={key}",
            base = self.config.base_url.trim_end_matches('/'),
            start = start.format("%Y-%m-%d"),
            end = end.format("%Y-%m-%d"),
            limit = self.config.limit,
            key = self.config.api_key,
        )
    }

    fn fetch_with_retry(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let url = self.aggregates_url(ticker, start, end);
        let mut last_error = None;
        let mut rate_limit_wait: Option<Duration> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.base_delay * 2u32.pow(attempt - 1);
                let delay = rate_limit_wait.take().map_or(backoff, |wait| wait.max(backoff));
                tracing::warn!(
                    ticker,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = ?last_error,
                    "retrying Polygon request"
                );
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Polygon rejected the API key".into(),
                ));
            }

            // Throttling is not a provider fault: wait it out without feeding the breaker.
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                rate_limit_wait = Some(Duration::from_secs(retry_after));
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    ticker: ticker.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {ticker}")));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
            let bars = parse_aggregates(ticker, &body)?;
            self.circuit_breaker.record_success();
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Parse an aggregates response body into bars, in response order.
pub fn parse_aggregates(ticker: &str, body: &str) -> Result<Vec<Bar>, DataError> {
    let resp: AggregatesResponse = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("{ticker}: {e}")))?;

    if resp.status.as_deref() == Some("ERROR") || resp.status.as_deref() == Some("NOT_AUTHORIZED") {
        let detail = resp
            .error
            .or(resp.message)
            .unwrap_or_else(|| "unspecified provider error".into());
        if resp.status.as_deref() == Some("NOT_AUTHORIZED") {
            return Err(DataError::AuthenticationRequired(detail));
        }
        return Err(DataError::ResponseFormatChanged(detail));
    }

    let results = match resp.results {
        Some(results) if !results.is_empty() => results,
        _ => {
            return Err(DataError::SymbolNotFound {
                ticker: ticker.to_string(),
            })
        }
    };

    results
        .into_iter()
        .map(|agg| {
            let date = chrono::DateTime::from_timestamp_millis(agg.t)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {}", agg.t))
                })?;
            Ok(Bar {
                date,
                open: agg.o,
                high: agg.h,
                low: agg.l,
                close: agg.c,
                volume: agg.v,
            })
        })
        .collect()
}

impl DataProvider for PolygonProvider {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        if end < start {
            return Err(DataError::Validation(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let raw = self.fetch_with_retry(ticker, start, end)?;
        let normalized = normalize(ticker, raw);
        Ok(FetchResult {
            dropped: normalized.dropped(),
            series: normalized.series,
            source: DataSource::Polygon,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    const SAMPLE: &str = r#"{
        "ticker": "AAPL",
        "queryCount": 2,
        "resultsCount": 2,
        "adjusted": true,
        "results": [
            {"v": 70790813.0, "vw": 131.6292, "o": 130.465, "c": 131.86, "h": 133.41, "l": 129.89, "t": 1673240400000, "n": 645365},
            {"v": 63896155.0, "vw": 129.8414, "o": 130.26, "c": 130.73, "h": 131.2636, "l": 128.12, "t": 1673326800000, "n": 554940}
        ],
        "status": "OK",
        "request_id": "abc",
        "count": 2
    }"#;

    #[test]
    fn parses_aggregates() {
        let bars = parse_aggregates("AAPL", SAMPLE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2023, 1, 9).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());
        assert_eq!(bars[0].open, 130.465);
        assert_eq!(bars[0].close, 131.86);
        assert_eq!(bars[1].volume, 63896155.0);
    }

    #[test]
    fn missing_results_is_symbol_not_found() {
        let body = r#"{"ticker":"ZZZZ","queryCount":0,"resultsCount":0,"adjusted":true,"status":"OK","request_id":"x"}"#;
        let err = parse_aggregates("ZZZZ", body).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { ticker } if ticker == "ZZZZ"));
    }

    #[test]
    fn empty_results_is_symbol_not_found() {
        let body = r#"{"status":"OK","results":[]}"#;
        assert!(matches!(
            parse_aggregates("ZZZZ", body),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn not_authorized_status() {
        let body = r#"{"status":"NOT_AUTHORIZED","message":"You are not entitled to this data."}"#;
        assert!(matches!(
            parse_aggregates("AAPL", body),
            Err(DataError::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn error_status_surfaces_message() {
        let body = r#"{"status":"ERROR","error":"Unknown API Key"}"#;
        match parse_aggregates("AAPL", body) {
            Err(DataError::ResponseFormatChanged(msg)) => assert!(msg.contains("Unknown API Key")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_format_change() {
        assert!(matches!(
            parse_aggregates("AAPL", "<html>"),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn url_carries_range_and_key() {
        let provider = PolygonProvider::new(
            ProviderConfig::new("k3y"),
            Arc::new(CircuitBreaker::default_provider()),
        )
        .unwrap();
        let url = provider.aggregates_url(
            "MSFT",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        );
        assert_eq!(
            url,
            "https://api.polygon.io/v2/aggs/ticker/MSFT/range/1/day/2024-01-02/2024-06-28\
             ?adjusted=true&sort=asc&limit=50000&apiKey=k3y"
        );
    }

    #[test]
    fn from_env_requires_key() {
        let err = ProviderConfig::from_env("SWINGSCAN_TEST_UNSET_KEY_VAR").unwrap_err();
        assert!(matches!(err, DataError::MissingApiKey { env_var } if env_var == "SWINGSCAN_TEST_UNSET_KEY_VAR"));
    }

    /// Serve `responses` canned HTTP responses on a local port, counting requests.
    fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (format!("http://{addr}"), hits)
    }

    const TOO_MANY: &str = "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 1\r\n\
                            Content-Length: 0\r\nConnection: close\r\n\r\n";

    fn local_config(base_url: String, max_retries: u32) -> ProviderConfig {
        let mut config = ProviderConfig::new("k");
        config.base_url = base_url;
        config.max_retries = max_retries;
        config.base_delay = Duration::from_millis(1);
        config.timeout = Duration::from_secs(5);
        config
    }

    #[test]
    fn rate_limit_waits_retry_after_and_leaves_breaker_closed() {
        let (base_url, hits) = serve(vec![TOO_MANY.to_string(); 4]);
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let provider = PolygonProvider::new(local_config(base_url, 3), Arc::clone(&breaker)).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let started = Instant::now();
        let result = provider.fetch("AAPL", d, d);

        assert!(matches!(
            result,
            Err(DataError::RateLimited { retry_after_secs: 1 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(breaker.is_allowed());
        assert!(provider.is_available());
    }

    #[test]
    fn rate_limit_then_success_returns_bars() {
        let ok = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            SAMPLE.len(),
            SAMPLE
        );
        let (base_url, hits) = serve(vec![TOO_MANY.to_string(), ok]);
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let provider = PolygonProvider::new(local_config(base_url, 2), Arc::clone(&breaker)).unwrap();

        let fetched = provider
            .fetch(
                "AAPL",
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
            )
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(fetched.series.len(), 2);
        assert!(breaker.is_allowed());
    }

    #[test]
    fn tripped_breaker_blocks_fetch() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        breaker.trip();
        let provider = PolygonProvider::new(ProviderConfig::new("k"), breaker).unwrap();
        assert!(!provider.is_available());
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(matches!(
            provider.fetch("AAPL", d, d),
            Err(DataError::CircuitBreakerTripped)
        ));
    }
}
