//! End-to-end tests for the growth ranking job over flat ticker files.

use std::path::Path;

use tempfile::TempDir;

use growth_screener::ranker::{self, RankOutcome, RankParams};
use growth_screener::report::RANKED_CSV_NAME;

const FULL_HEADER: &str =
    "date,ticker,close,adjClose,volume,splitFactor,marketCap,enterpriseVal,peRatio,pbRatio,trailingPEG1Y";

/// Write a ticker file with equal close/adjClose columns, one row per value.
fn write_history(dir: &Path, ticker: &str, closes: &[f64]) {
    let mut content = String::from(FULL_HEADER);
    content.push('\n');
    for (i, close) in closes.iter().enumerate() {
        content.push_str(&format!(
            "2024-03-{:02},{},{},{},1000,1.0,N/A,N/A,N/A,N/A,N/A\n",
            i + 1,
            ticker,
            close,
            close
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", ticker)), content).unwrap();
}

#[test]
fn test_ranking_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let daily_dir = dir.path().join("daily_data");
    let results_dir = dir.path().join("rank_results");
    std::fs::create_dir_all(&daily_dir).unwrap();

    // AAA: 10% growth, close 11 > 5. BBB: 3% growth, close 10.3 > 5.
    write_history(&daily_dir, "AAA", &[10.0, 10.0, 10.0, 10.0, 11.0]);
    write_history(&daily_dir, "BBB", &[10.0, 10.0, 10.0, 10.0, 10.3]);

    let outcome = ranker::run(&daily_dir, &results_dir, &RankParams::default()).unwrap();
    assert_eq!(outcome, RankOutcome::Written { tickers: 2, pages: 1 });

    let csv = std::fs::read_to_string(results_dir.join(RANKED_CSV_NAME)).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);

    // AAA (10%) ranks above BBB (3%); growth is a rounded percentage. The
    // 10% growth also proves the upper bound of the growth band is inclusive.
    assert!(lines[1].starts_with("AAA,2024-03-05,11"));
    assert!(lines[1].ends_with("10.0"), "line was: {}", lines[1]);
    assert!(lines[2].starts_with("BBB,2024-03-05,10.3"));
    assert!(lines[2].ends_with("3.0"), "line was: {}", lines[2]);
    assert!(lines[1].contains("N/A"));

    assert!(results_dir.join("ticker_growth_report_page_1.svg").exists());
    assert!(!results_dir.join("ticker_growth_report_page_2.svg").exists());
}

#[test]
fn test_file_without_adjclose_header_is_skipped() {
    let dir = TempDir::new().unwrap();
    let daily_dir = dir.path().join("daily_data");
    let results_dir = dir.path().join("rank_results");
    std::fs::create_dir_all(&daily_dir).unwrap();

    std::fs::write(
        daily_dir.join("NOADJ.csv"),
        "date,ticker,close\n2024-03-01,NOADJ,10.0\n",
    )
    .unwrap();
    write_history(&daily_dir, "GOOD", &[10.0, 10.0, 10.0, 10.0, 10.5]);

    let outcome = ranker::run(&daily_dir, &results_dir, &RankParams::default()).unwrap();
    assert_eq!(outcome, RankOutcome::Written { tickers: 1, pages: 1 });

    let csv = std::fs::read_to_string(results_dir.join(RANKED_CSV_NAME)).unwrap();
    assert!(csv.contains("GOOD"));
    assert!(!csv.contains("NOADJ"));
}

#[test]
fn test_no_valid_files_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let daily_dir = dir.path().join("daily_data");
    let results_dir = dir.path().join("rank_results");
    std::fs::create_dir_all(&daily_dir).unwrap();

    std::fs::write(daily_dir.join("JUNK.csv"), "foo,bar\n1,2\n").unwrap();

    let outcome = ranker::run(&daily_dir, &results_dir, &RankParams::default()).unwrap();
    assert_eq!(outcome, RankOutcome::NoValidFiles);
    assert!(!results_dir.exists());
}

#[test]
fn test_no_qualifying_ticker_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let daily_dir = dir.path().join("daily_data");
    let results_dir = dir.path().join("rank_results");
    std::fs::create_dir_all(&daily_dir).unwrap();

    // 15% growth: outside the [2%, 10%] band.
    write_history(&daily_dir, "FAST", &[10.0, 10.0, 10.0, 10.0, 11.5]);
    // Under the price floor despite qualifying growth.
    write_history(&daily_dir, "CHEAP", &[4.0, 4.0, 4.0, 4.0, 4.2]);

    let outcome = ranker::run(&daily_dir, &results_dir, &RankParams::default()).unwrap();
    assert_eq!(outcome, RankOutcome::NoMatches);
    assert!(!results_dir.exists());
}

#[test]
fn test_window_tunable_changes_qualification() {
    let dir = TempDir::new().unwrap();
    let daily_dir = dir.path().join("daily_data");
    let results_dir = dir.path().join("rank_results");
    std::fs::create_dir_all(&daily_dir).unwrap();

    // Only 3 rows: excluded at the default window, included at window 3.
    write_history(&daily_dir, "SHORT", &[10.0, 10.0, 10.5]);

    let outcome = ranker::run(&daily_dir, &results_dir, &RankParams::default()).unwrap();
    assert_eq!(outcome, RankOutcome::NoMatches);

    let params = RankParams {
        window_days: 3,
        ..RankParams::default()
    };
    let outcome = ranker::run(&daily_dir, &results_dir, &params).unwrap();
    assert_eq!(outcome, RankOutcome::Written { tickers: 1, pages: 1 });
}
