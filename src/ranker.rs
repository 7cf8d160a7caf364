//! Growth ranking over the daily-data directory.
//!
//! A stateless batch job: discover files that carry the shared schema's
//! required columns, load them leniently, compute a trailing-window growth
//! statistic per ticker, then filter, rank, and hand the survivors to the
//! report writer. Files that don't match the schema and tickers with too
//! little history are filtering criteria here, not errors.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::models::GrowthSummary;
use crate::report;
use crate::schema::{self, DailyRow};
use crate::store;

/// Tunables for the ranking job.
#[derive(Debug, Clone)]
pub struct RankParams {
    pub window_days: usize,
    pub min_price: f64,
    pub top_n: usize,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            window_days: 5,
            min_price: 5.0,
            top_n: 50,
        }
    }
}

/// Growth band the ranker keeps, both bounds inclusive.
const GROWTH_BAND: (f64, f64) = (0.02, 0.10);

/// What the ranking job produced.
#[derive(Debug, PartialEq, Eq)]
pub enum RankOutcome {
    NoValidFiles,
    NoMatches,
    Written { tickers: usize, pages: usize },
}

/// Run the full ranking job over the daily-data directory.
pub fn run(daily_data_dir: &Path, results_dir: &Path, params: &RankParams) -> Result<RankOutcome> {
    let histories = load_daily_histories(daily_data_dir)?;
    if histories.is_empty() {
        info!("No valid price history files found in {}", daily_data_dir.display());
        return Ok(RankOutcome::NoValidFiles);
    }

    let summaries = growth_summaries(&histories, params.window_days);
    let ranked = filter_and_rank(summaries, params);
    if ranked.is_empty() {
        info!("No tickers matched the growth criteria");
        return Ok(RankOutcome::NoMatches);
    }

    let pages = report::write_rank_report(results_dir, &ranked, &histories, params.window_days)?;
    info!("✅ Ranked {} tickers across {} chart pages", ranked.len(), pages);
    Ok(RankOutcome::Written {
        tickers: ranked.len(),
        pages,
    })
}

/// Load every schema-matching CSV under `dir`, grouped by ticker and sorted
/// chronologically. A missing directory is treated the same as an empty one.
pub fn load_daily_histories(dir: &Path) -> Result<BTreeMap<String, Vec<DailyRow>>> {
    let mut by_ticker: BTreeMap<String, Vec<DailyRow>> = BTreeMap::new();
    if !dir.exists() {
        return Ok(by_ticker);
    }

    for file in store::list_csv_files(dir)? {
        match load_daily_file(&file) {
            Some(rows) => {
                for row in rows {
                    by_ticker.entry(row.ticker.clone()).or_default().push(row);
                }
            }
            None => debug!("Skipping {}: schema mismatch or unparsable", file.display()),
        }
    }

    for rows in by_ticker.values_mut() {
        rows.sort_by_key(|row| row.date);
    }
    Ok(by_ticker)
}

/// Parse one file, or `None` if it should be silently skipped.
///
/// `date` and `adjclose` are required (case/whitespace-insensitive header
/// match); `ticker` falls back to the file stem; the remaining columns are
/// optional with defaults so partially populated files still rank.
fn load_daily_file(path: &Path) -> Option<Vec<DailyRow>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path).ok()?;
    let headers: Vec<String> = reader
        .headers()
        .ok()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    if !schema::REQUIRED_COLUMNS
        .iter()
        .all(|required| headers.iter().any(|h| h == required))
    {
        return None;
    }

    let index = |name: &str| headers.iter().position(|h| h == name);
    let date_idx = index("date")?;
    let adj_close_idx = index("adjclose")?;
    let ticker_idx = index("ticker");
    let close_idx = index("close");
    let volume_idx = index("volume");
    let split_idx = index("splitfactor");
    let market_cap_idx = index("marketcap");
    let enterprise_idx = index("enterpriseval");
    let pe_idx = index("peratio");
    let pb_idx = index("pbratio");
    let peg_idx = index("trailingpeg1y");

    let fallback_ticker = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;

        let date =
            NaiveDate::parse_from_str(record.get(date_idx)?.trim(), "%Y-%m-%d").ok()?;
        let adj_close: f64 = record.get(adj_close_idx)?.trim().parse().ok()?;

        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        let ticker = match field(ticker_idx).trim() {
            "" => fallback_ticker.clone(),
            t => t.to_string(),
        };

        rows.push(DailyRow {
            date,
            ticker,
            close: field(close_idx).trim().parse().unwrap_or(0.0),
            adj_close,
            volume: field(volume_idx).trim().parse::<f64>().unwrap_or(0.0) as i64,
            split_factor: field(split_idx).trim().parse().unwrap_or(1.0),
            market_cap: schema::parse_opt_na(field(market_cap_idx)).unwrap_or(None),
            enterprise_val: schema::parse_opt_na(field(enterprise_idx)).unwrap_or(None),
            pe_ratio: schema::parse_opt_na(field(pe_idx)).unwrap_or(None),
            pb_ratio: schema::parse_opt_na(field(pb_idx)).unwrap_or(None),
            trailing_peg_1y: schema::parse_opt_na(field(peg_idx)).unwrap_or(None),
        });
    }
    Some(rows)
}

/// Compute the trailing-window growth statistic for every ticker with at
/// least `window_days` rows. Shorter histories are silently excluded.
pub fn growth_summaries(
    histories: &BTreeMap<String, Vec<DailyRow>>,
    window_days: usize,
) -> Vec<GrowthSummary> {
    let window = window_days.max(1);

    histories
        .iter()
        .filter(|(_, rows)| rows.len() >= window)
        .map(|(ticker, rows)| {
            let latest = &rows[rows.len() - 1];
            let start = rows[rows.len() - window].adj_close;
            let growth_pct = if start > 0.0 {
                (latest.adj_close - start) / start
            } else {
                0.0
            };

            GrowthSummary {
                ticker: ticker.clone(),
                date: latest.date,
                close: latest.close,
                volume: latest.volume,
                adj_close: latest.adj_close,
                split_factor: latest.split_factor,
                market_cap: latest.market_cap,
                enterprise_val: latest.enterprise_val,
                pe_ratio: latest.pe_ratio,
                pb_ratio: latest.pb_ratio,
                trailing_peg_1y: latest.trailing_peg_1y,
                growth_pct,
            }
        })
        .collect()
}

/// Keep tickers above the price floor and inside the growth band, sort
/// descending by growth, truncate to the top N. The sort is stable, so ties
/// keep the deterministic ticker order the summaries arrived in.
pub fn filter_and_rank(mut summaries: Vec<GrowthSummary>, params: &RankParams) -> Vec<GrowthSummary> {
    let (lo, hi) = GROWTH_BAND;
    summaries.retain(|s| s.close > params.min_price && s.growth_pct >= lo && s.growth_pct <= hi);
    summaries.sort_by(|a, b| {
        b.growth_pct
            .partial_cmp(&a.growth_pct)
            .unwrap_or(Ordering::Equal)
    });
    summaries.truncate(params.top_n);
    summaries
}
