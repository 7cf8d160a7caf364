//! Orchestration of the two fetch jobs: the metadata refresh and the
//! fetch-and-merge pipeline. Both run to completion and return an explicit
//! result instead of mutating any global state.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::MarketDataProvider;
use crate::fetcher;
use crate::merger;
use crate::models::{Config, RunSummary, TickerFailure, TickerMeta};
use crate::store;

/// Refresh the active-ticker universe from the fundamentals meta endpoint.
///
/// Keeps only entries with `isActive == true` and overwrites the meta CSV.
/// Any failure here is fatal: the other jobs are meaningless without a
/// ticker universe.
pub async fn refresh_meta(config: &Config, provider: &dyn MarketDataProvider) -> Result<usize> {
    info!("📡 Fetching fundamentals meta data");
    let body = provider.fetch_meta().await?;

    let entries: Vec<TickerMeta> =
        serde_json::from_value(body).context("malformed fundamentals meta payload")?;
    let total = entries.len();
    let active: Vec<TickerMeta> = entries.into_iter().filter(|m| m.is_active).collect();
    info!("Kept {} active tickers out of {}", active.len(), total);

    store::write_ticker_universe(&config.paths.meta_csv, &active)?;
    Ok(active.len())
}

/// Run the fetch → merge → filter → persist pipeline over the ticker
/// universe. Per-ticker failures land in the returned summary's missing map;
/// only broken preconditions (no meta CSV, unwritable output directory)
/// abort the run.
pub async fn fetch_and_merge(
    config: &Config,
    provider: &dyn MarketDataProvider,
) -> Result<RunSummary> {
    let tickers = store::read_ticker_universe(&config.paths.meta_csv)?;
    info!(
        "📊 Fetching {} data kinds for {} tickers ({} concurrent requests max)",
        crate::models::DataKind::ALL.len(),
        tickers.len(),
        config.fetch_concurrency
    );

    let outcomes = fetcher::fetch_all(provider, &tickers, config.fetch_concurrency).await;
    let (tables, mut missing) = merger::merge_outcomes(outcomes);

    let daily_dir: &Path = &config.paths.daily_data_dir;
    store::ensure_dir(daily_dir)?;

    let mut written = 0;
    for table in &tables {
        match store::write_daily_table(daily_dir, table) {
            Ok(path) => {
                written += 1;
                debug!("Saved {} rows to {}", table.rows.len(), path.display());
            }
            Err(e) => {
                warn!("Unable to save {}: {}", table.ticker, e);
                missing.insert(table.ticker.clone(), TickerFailure::Write(e.to_string()));
            }
        }
    }

    let summary = RunSummary { written, missing };
    if summary.missing.is_empty() {
        info!("✅ Wrote {} ticker files, no failures", summary.written);
    } else {
        warn!(
            "Wrote {} ticker files; missing tickers: {:?}",
            summary.written,
            summary.missing_tickers()
        );
    }
    Ok(summary)
}
