//! Per-ticker merge of the two fetched series.
//!
//! Fetch outcomes arrive in arbitrary completion order, so both series are
//! accumulated per ticker first and the join runs once after the barrier.
//! That makes the merge commutative in arrival order by construction.
//! The join itself is an inner join on date: a date present in only one
//! series is silently dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::fetcher::FetchOutcome;
use crate::models::{DataKind, FundamentalsRow, PriceRow, TickerFailure};
use crate::schema::DailyRow;

/// Fully merged, column-filtered table for one ticker, ordered by date.
#[derive(Debug, Clone)]
pub struct MergedTable {
    pub ticker: String,
    pub rows: Vec<DailyRow>,
}

/// Group fetch outcomes by ticker and join the two series.
///
/// Every ticker that appears in the input ends up either in the returned
/// tables or in the missing map with the reason it failed; a ticker with a
/// failed or absent series never produces a partial table.
pub fn merge_outcomes(
    outcomes: Vec<FetchOutcome>,
) -> (Vec<MergedTable>, BTreeMap<String, TickerFailure>) {
    let mut prices: HashMap<String, Value> = HashMap::new();
    let mut fundamentals: HashMap<String, Value> = HashMap::new();
    let mut missing: BTreeMap<String, TickerFailure> = BTreeMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Payload { ticker, kind, body } => {
                seen.insert(ticker.clone());
                match kind {
                    DataKind::DailyPrices => prices.insert(ticker, body),
                    DataKind::Fundamentals => fundamentals.insert(ticker, body),
                };
            }
            FetchOutcome::Failed { ticker, kind, reason } => {
                seen.insert(ticker.clone());
                missing
                    .entry(ticker)
                    .or_insert(TickerFailure::Fetch { kind, reason });
            }
        }
    }

    let mut tables = Vec::new();
    for ticker in seen {
        if missing.contains_key(&ticker) {
            continue;
        }

        match build_table(&ticker, prices.remove(&ticker), fundamentals.remove(&ticker)) {
            Ok(table) => {
                debug!("Merged {} rows for {}", table.rows.len(), ticker);
                tables.push(table);
            }
            Err(failure) => {
                warn!("Unable to merge {}: {}", ticker, failure);
                missing.insert(ticker, failure);
            }
        }
    }

    (tables, missing)
}

fn build_table(
    ticker: &str,
    prices: Option<Value>,
    fundamentals: Option<Value>,
) -> Result<MergedTable, TickerFailure> {
    let prices = prices.ok_or(TickerFailure::MissingSeries(DataKind::DailyPrices))?;
    let fundamentals = fundamentals.ok_or(TickerFailure::MissingSeries(DataKind::Fundamentals))?;

    let price_rows: Vec<PriceRow> =
        serde_json::from_value(prices).map_err(|e| TickerFailure::MalformedPayload {
            kind: DataKind::DailyPrices,
            reason: e.to_string(),
        })?;
    let fundamentals_rows: Vec<FundamentalsRow> =
        serde_json::from_value(fundamentals).map_err(|e| TickerFailure::MalformedPayload {
            kind: DataKind::Fundamentals,
            reason: e.to_string(),
        })?;

    // Order and dedupe the price series by date; last record wins.
    let price_by_date: BTreeMap<NaiveDate, PriceRow> = price_rows
        .into_iter()
        .map(|row| (row.date, row))
        .collect();
    let fundamentals_by_date: HashMap<NaiveDate, FundamentalsRow> = fundamentals_rows
        .into_iter()
        .map(|row| (row.date, row))
        .collect();

    let rows: Vec<DailyRow> = price_by_date
        .values()
        .filter_map(|price| {
            fundamentals_by_date
                .get(&price.date)
                .map(|f| DailyRow::from_series(ticker, price, f))
        })
        .collect();

    Ok(MergedTable {
        ticker: ticker.to_string(),
        rows,
    })
}
