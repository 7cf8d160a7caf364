//! Flat-file persistence: the active-ticker meta CSV and the per-ticker
//! daily-data CSVs. One file per ticker, overwritten on every run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::merger::MergedTable;
use crate::models::TickerMeta;

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("unable to create directory {}", dir.display()))
}

/// Path of the daily-data CSV for one ticker.
pub fn ticker_csv_path(dir: &Path, ticker: &str) -> PathBuf {
    dir.join(format!("{}.csv", ticker))
}

/// Write the filtered active-ticker universe to the meta CSV.
pub fn write_ticker_universe(path: &Path, tickers: &[TickerMeta]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("unable to open {} for writing", path.display()))?;
    for meta in tickers {
        writer.serialize(meta)?;
    }
    writer.flush()?;

    info!("Wrote {} active tickers to {}", tickers.len(), path.display());
    Ok(())
}

/// Read the ticker universe back from the meta CSV. The file is a hard
/// precondition of the fetch job, so its absence is an error, not a skip.
pub fn read_ticker_universe(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(anyhow!(
            "meta CSV not found at {}; run the fetch-meta job first",
            path.display()
        ));
    }

    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("unable to read {}", path.display()))?;

    let mut tickers = Vec::new();
    for record in reader.deserialize() {
        let meta: TickerMeta = record?;
        tickers.push(meta.ticker);
    }
    Ok(tickers)
}

/// Write one ticker's merged table, overwriting any previous run's file.
pub fn write_daily_table(dir: &Path, table: &MergedTable) -> Result<PathBuf> {
    let path = ticker_csv_path(dir, &table.ticker);

    let mut writer = WriterBuilder::new()
        .from_path(&path)
        .with_context(|| format!("unable to open {} for writing", path.display()))?;
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(path)
}

/// All CSV files under the daily-data directory, in name order so a run is
/// deterministic.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DailyRow;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn meta(ticker: &str) -> TickerMeta {
        TickerMeta {
            ticker: ticker.to_string(),
            name: Some(format!("{} Inc.", ticker)),
            sector: Some("Technology".to_string()),
            industry: None,
            is_active: true,
        }
    }

    #[test]
    fn test_ticker_universe_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta").join("fundamental_meta.csv");

        write_ticker_universe(&path, &[meta("AAPL"), meta("MSFT")]).unwrap();
        let tickers = read_ticker_universe(&path).unwrap();

        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_missing_meta_csv_is_an_error() {
        let dir = tempdir().unwrap();
        let err = read_ticker_universe(&dir.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("fetch-meta"));
    }

    #[test]
    fn test_write_daily_table_overwrites() {
        let dir = tempdir().unwrap();
        let row = DailyRow {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ticker: "AAPL".to_string(),
            close: 10.0,
            adj_close: 10.0,
            volume: 500,
            split_factor: 1.0,
            market_cap: None,
            enterprise_val: None,
            pe_ratio: None,
            pb_ratio: None,
            trailing_peg_1y: None,
        };
        let table = MergedTable {
            ticker: "AAPL".to_string(),
            rows: vec![row.clone(), row],
        };

        let path = write_daily_table(dir.path(), &table).unwrap();
        assert_eq!(path, dir.path().join("AAPL.csv"));

        let shorter = MergedTable {
            ticker: "AAPL".to_string(),
            rows: table.rows[..1].to_vec(),
        };
        write_daily_table(dir.path(), &shorter).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        // Header plus exactly one data row after the overwrite.
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_list_csv_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("BBB.csv"), "date,adjClose\n").unwrap();
        std::fs::write(dir.path().join("AAA.csv"), "date,adjClose\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["AAA.csv", "BBB.csv"]);
    }
}
