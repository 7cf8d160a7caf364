use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::MarketDataProvider;
use crate::models::{Config, DataKind};

/// Tiingo API client. One instance holds the shared connection pool used by
/// every concurrent request in a run.
pub struct TiingoClient {
    client: Client,
    base_url: Url,
    api_key: String,
    start_date: NaiveDate,
}

impl TiingoClient {
    /// Create a new Tiingo client
    pub fn new(config: &Config) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("API_KEY is empty; refusing to send unauthenticated requests"));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("growth-screener/1.0")
            .build()?;

        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            start_date: config.start_date,
        })
    }

    fn series_url(&self, ticker: &str, kind: DataKind) -> Result<Url> {
        let path = match kind {
            DataKind::DailyPrices => format!("tiingo/daily/{}/prices", ticker),
            DataKind::Fundamentals => format!("tiingo/fundamentals/{}/daily", ticker),
        };

        let mut url = self.base_url.join(&path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("startDate", &self.start_date.format("%Y-%m-%d").to_string());
            if kind == DataKind::DailyPrices {
                pairs.append_pair("resampleFreq", "daily");
            }
            pairs.append_pair("token", &self.api_key);
        }
        Ok(url)
    }

    fn meta_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("tiingo/fundamentals/meta")?;
        url.query_pairs_mut().append_pair("token", &self.api_key);
        Ok(url)
    }

    /// Issue a GET and parse the JSON body, failing on non-2xx statuses.
    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!("Making request to: {}", url.path());

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("API request failed with status {}: {}", status, error_text));
        }

        let json: Value = response.json().await?;
        Ok(json)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for TiingoClient {
    async fn fetch_series(&self, ticker: &str, kind: DataKind) -> Result<Value> {
        let url = self.series_url(ticker, kind)?;
        self.get_json(url).await
    }

    async fn fetch_meta(&self) -> Result<Value> {
        let url = self.meta_url()?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataPaths;

    fn test_config() -> Config {
        Config {
            api_key: "secret".to_string(),
            base_url: "https://api.tiingo.com".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            fetch_concurrency: 4,
            paths: DataPaths {
                meta_csv: "meta_data/fundamental_meta.csv".into(),
                daily_data_dir: "daily_data".into(),
                results_dir: "rank_results".into(),
            },
        }
    }

    #[test]
    fn test_series_url_templates() {
        let client = TiingoClient::new(&test_config()).unwrap();

        let prices = client.series_url("AAPL", DataKind::DailyPrices).unwrap();
        assert_eq!(prices.path(), "/tiingo/daily/AAPL/prices");
        assert!(prices.query().unwrap().contains("startDate=2024-01-01"));
        assert!(prices.query().unwrap().contains("resampleFreq=daily"));
        assert!(prices.query().unwrap().contains("token=secret"));

        let fundamentals = client.series_url("AAPL", DataKind::Fundamentals).unwrap();
        assert_eq!(fundamentals.path(), "/tiingo/fundamentals/AAPL/daily");
        assert!(!fundamentals.query().unwrap().contains("resampleFreq"));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let mut config = test_config();
        config.api_key = "  ".to_string();
        assert!(TiingoClient::new(&config).is_err());
    }
}
