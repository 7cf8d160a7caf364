use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// The two Tiingo series fetched for every ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    DailyPrices,
    Fundamentals,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::DailyPrices => write!(f, "daily price"),
            DataKind::Fundamentals => write!(f, "fundamentals"),
        }
    }
}

impl DataKind {
    pub const ALL: [DataKind; 2] = [DataKind::DailyPrices, DataKind::Fundamentals];
}

/// Ticker metadata row, shared between the Tiingo meta payload and the
/// active-ticker CSV it is persisted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerMeta {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
}

/// One record of the Tiingo daily price series.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRow {
    #[serde(deserialize_with = "date_only")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    #[serde(rename = "adjOpen")]
    pub adj_open: f64,
    #[serde(rename = "adjHigh")]
    pub adj_high: f64,
    #[serde(rename = "adjLow")]
    pub adj_low: f64,
    #[serde(rename = "adjClose")]
    pub adj_close: f64,
    #[serde(rename = "adjVolume")]
    pub adj_volume: f64,
    #[serde(rename = "divCash")]
    pub div_cash: f64,
    #[serde(rename = "splitFactor")]
    pub split_factor: f64,
}

/// One record of the Tiingo daily fundamentals series. Tiingo omits or nulls
/// fields it has no value for, so everything but the date is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct FundamentalsRow {
    #[serde(deserialize_with = "date_only")]
    pub date: NaiveDate,
    #[serde(rename = "marketCap", default)]
    pub market_cap: Option<f64>,
    #[serde(rename = "enterpriseVal", default)]
    pub enterprise_val: Option<f64>,
    #[serde(rename = "peRatio", default)]
    pub pe_ratio: Option<f64>,
    #[serde(rename = "pbRatio", default)]
    pub pb_ratio: Option<f64>,
    #[serde(rename = "trailingPEG1Y", default)]
    pub trailing_peg_1y: Option<f64>,
}

/// Parse a Tiingo timestamp like `2024-01-02T00:00:00.000Z` down to its date.
/// The time-of-day portion is discarded so both series join on plain dates.
fn date_only<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

/// Why a ticker ended up in the missing set.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TickerFailure {
    #[error("{kind} fetch failed: {reason}")]
    Fetch { kind: DataKind, reason: String },
    #[error("{0} series absent from fetch results")]
    MissingSeries(DataKind),
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: DataKind, reason: String },
    #[error("failed to write csv: {0}")]
    Write(String),
}

/// Terminal result of a fetch-and-merge run. Threaded back to the caller so
/// the pipeline stays reentrant and testable.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: usize,
    pub missing: BTreeMap<String, TickerFailure>,
}

impl RunSummary {
    pub fn missing_tickers(&self) -> Vec<&str> {
        self.missing.keys().map(String::as_str).collect()
    }
}

/// Filesystem layout shared by all three jobs. Split out from `Config` so the
/// ranking job can run without an API credential.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub meta_csv: PathBuf,
    pub daily_data_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl DataPaths {
    /// Load paths from environment variables, falling back to the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_current_env()
    }

    fn from_current_env() -> Self {
        DataPaths {
            meta_csv: std::env::var("META_CSV_PATH")
                .unwrap_or_else(|_| "meta_data/fundamental_meta.csv".to_string())
                .into(),
            daily_data_dir: std::env::var("DAILY_DATA_DIR")
                .unwrap_or_else(|_| "daily_data".to_string())
                .into(),
            results_dir: std::env::var("RESULTS_DIR")
                .unwrap_or_else(|_| "rank_results".to_string())
                .into(),
        }
    }
}

/// Configuration for the fetch jobs.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub start_date: NaiveDate,
    pub fetch_concurrency: usize,
    pub paths: DataPaths,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_current_env()
    }

    /// Read configuration from the process environment as it is, without
    /// pulling in a `.env` file first.
    fn from_current_env() -> anyhow::Result<Self> {
        Ok(Config {
            api_key: std::env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY environment variable required"))?,
            base_url: std::env::var("TIINGO_BASE_URL")
                .unwrap_or_else(|_| "https://api.tiingo.com".to_string()),
            start_date: std::env::var("FETCH_START_DATE")
                .ok()
                .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
                .unwrap_or_else(|| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            fetch_concurrency: std::env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .unwrap_or(16),
            paths: DataPaths::from_current_env(),
        })
    }
}

/// Per-ticker snapshot produced by the growth ranker: the most recent daily
/// row plus the trailing-window growth statistic.
#[derive(Debug, Clone, Serialize)]
pub struct GrowthSummary {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    #[serde(rename = "adjClose")]
    pub adj_close: f64,
    #[serde(rename = "splitFactor")]
    pub split_factor: f64,
    #[serde(rename = "marketCap", serialize_with = "crate::schema::ser_opt_na")]
    pub market_cap: Option<f64>,
    #[serde(rename = "enterpriseVal", serialize_with = "crate::schema::ser_opt_na")]
    pub enterprise_val: Option<f64>,
    #[serde(rename = "peRatio", serialize_with = "crate::schema::ser_opt_na")]
    pub pe_ratio: Option<f64>,
    #[serde(rename = "pbRatio", serialize_with = "crate::schema::ser_opt_na")]
    pub pb_ratio: Option<f64>,
    #[serde(rename = "trailingPEG1Y", serialize_with = "crate::schema::ser_opt_na")]
    pub trailing_peg_1y: Option<f64>,
    /// Stored as a fraction; serialized as a percentage rounded to 2 decimals.
    #[serde(rename = "growth_pct", serialize_with = "ser_growth_percent")]
    pub growth_pct: f64,
}

fn ser_growth_percent<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64((value * 10_000.0).round() / 100.0)
}
