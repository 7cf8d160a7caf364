//! Shared schema for the merged-and-filtered per-ticker tables.
//!
//! Both halves of the pipeline depend on this module: the fetch job writes
//! `DailyRow`s out through the persister, and the growth ranker reads the
//! same columns back. Keeping the schema in one place is what guarantees the
//! two stages never drift apart on column names.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{FundamentalsRow, PriceRow};

/// Columns a file must carry (after trim + lowercase) to be picked up by the
/// ranker's discovery scan.
pub const REQUIRED_COLUMNS: [&str; 2] = ["date", "adjclose"];

/// One merged row: the surviving price fields joined with the fundamentals
/// fields for the same (date, ticker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    #[serde(rename = "adjClose")]
    pub adj_close: f64,
    pub volume: i64,
    #[serde(rename = "splitFactor")]
    pub split_factor: f64,
    #[serde(
        rename = "marketCap",
        serialize_with = "ser_opt_na",
        deserialize_with = "de_opt_na",
        default
    )]
    pub market_cap: Option<f64>,
    #[serde(
        rename = "enterpriseVal",
        serialize_with = "ser_opt_na",
        deserialize_with = "de_opt_na",
        default
    )]
    pub enterprise_val: Option<f64>,
    #[serde(
        rename = "peRatio",
        serialize_with = "ser_opt_na",
        deserialize_with = "de_opt_na",
        default
    )]
    pub pe_ratio: Option<f64>,
    #[serde(
        rename = "pbRatio",
        serialize_with = "ser_opt_na",
        deserialize_with = "de_opt_na",
        default
    )]
    pub pb_ratio: Option<f64>,
    #[serde(
        rename = "trailingPEG1Y",
        serialize_with = "ser_opt_na",
        deserialize_with = "de_opt_na",
        default
    )]
    pub trailing_peg_1y: Option<f64>,
}

impl DailyRow {
    /// Project a joined (price, fundamentals) pair onto the output schema.
    ///
    /// This is the column filter: the unadjusted `open`/`high`/`low` fields,
    /// their adjusted variants, `adjVolume`, and `divCash` are dropped here
    /// and never reach the per-ticker CSVs.
    pub fn from_series(ticker: &str, price: &PriceRow, fundamentals: &FundamentalsRow) -> Self {
        DailyRow {
            date: price.date,
            ticker: ticker.to_string(),
            close: price.close,
            adj_close: price.adj_close,
            volume: price.volume,
            split_factor: price.split_factor,
            market_cap: fundamentals.market_cap,
            enterprise_val: fundamentals.enterprise_val,
            pe_ratio: fundamentals.pe_ratio,
            pb_ratio: fundamentals.pb_ratio,
            trailing_peg_1y: fundamentals.trailing_peg_1y,
        }
    }
}

/// Serialize a missing fundamentals value as the `N/A` sentinel the report
/// consumers expect.
pub fn ser_opt_na<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_str("N/A"),
    }
}

/// Accept `N/A`, empty, or a plain number when reading rows back.
pub fn de_opt_na<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_opt_na(&raw).map_err(serde::de::Error::custom)
}

/// Shared lenient parse for optional numeric cells.
pub fn parse_opt_na(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}
