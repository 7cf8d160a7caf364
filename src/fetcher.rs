//! Concurrent fan-out over every (ticker, data-kind) pair.
//!
//! All requests share one client/connection pool and run through a bounded
//! `buffer_unordered` stream, so a slow API never sees more than the
//! configured number of requests in flight. A failing request is converted
//! into a `FetchOutcome::Failed` marker instead of aborting the batch; the
//! caller gets every outcome back after a single synchronization point.

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::MarketDataProvider;
use crate::models::DataKind;

/// Result of one fetch call. Failures carry the reason so the merger can
/// record the ticker in the missing set with context.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Payload {
        ticker: String,
        kind: DataKind,
        body: Value,
    },
    Failed {
        ticker: String,
        kind: DataKind,
        reason: String,
    },
}

impl FetchOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            FetchOutcome::Payload { ticker, .. } => ticker,
            FetchOutcome::Failed { ticker, .. } => ticker,
        }
    }
}

/// Fetch both series for every ticker, at most `concurrency` requests in
/// flight at once. Waits for every call to resolve before returning.
pub async fn fetch_all<P>(provider: &P, tickers: &[String], concurrency: usize) -> Vec<FetchOutcome>
where
    P: MarketDataProvider + ?Sized,
{
    let requests: Vec<(String, DataKind)> = tickers
        .iter()
        .flat_map(|ticker| DataKind::ALL.iter().map(|kind| (ticker.clone(), *kind)))
        .collect();

    debug!("Dispatching {} requests for {} tickers", requests.len(), tickers.len());

    stream::iter(requests)
        .map(|(ticker, kind)| async move {
            match provider.fetch_series(&ticker, kind).await {
                Ok(body) => FetchOutcome::Payload { ticker, kind, body },
                Err(e) => {
                    warn!("Failed to fetch {} data for {}: {}", kind, ticker, e);
                    FetchOutcome::Failed {
                        ticker,
                        kind,
                        reason: e.to_string(),
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
