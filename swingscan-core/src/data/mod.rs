//! Market data retrieval.
//!
//! Providers fetch daily bars and hand back a normalised `Series`. Rate
//! limiting, retries and request pacing all live here, never in the engine.

pub mod circuit_breaker;
pub mod csv_import;
pub mod normalize;
pub mod pacing;
pub mod polygon;
pub mod provider;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use normalize::{normalize, Normalized};
pub use pacing::RequestPacer;
pub use polygon::{PolygonProvider, ProviderConfig};
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
