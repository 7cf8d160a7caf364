use anyhow::Result;
use serde_json::Value;

use crate::models::DataKind;

pub mod tiingo_client;
pub use tiingo_client::TiingoClient;

/// Common trait for market data sources, so the fetcher and the jobs can be
/// exercised against a mock HTTP server in tests.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch one data-kind series for one ticker. Returns the raw JSON body;
    /// typed parsing is the merger's job.
    async fn fetch_series(&self, ticker: &str, kind: DataKind) -> Result<Value>;

    /// Fetch the fundamentals meta listing (all known tickers with their
    /// `isActive` flag).
    async fn fetch_meta(&self) -> Result<Value>;
}
