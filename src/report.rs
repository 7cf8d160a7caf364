//! Report output for the ranking job: the top-N CSV and the chart pages.
//!
//! Charts are rendered as one SVG per page, each page a 2×2 grid of
//! adjusted-close line charts over the ticker's most recent rows. Cells
//! without a ticker on the final page are left blank.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::models::GrowthSummary;
use crate::schema::DailyRow;
use crate::store;

/// Rows of history drawn per chart panel.
const CHART_TAIL_ROWS: usize = 30;
/// Ranked tickers per chart page.
const TICKERS_PER_PAGE: usize = 4;

pub const RANKED_CSV_NAME: &str = "top_50_growth_tickers.csv";

/// Write the ranked CSV and the chart pages. Returns the number of chart
/// pages written. Must only be called with a non-empty ranking; the caller
/// is responsible for not emitting files when nothing qualified.
pub fn write_rank_report(
    results_dir: &Path,
    ranked: &[GrowthSummary],
    histories: &BTreeMap<String, Vec<DailyRow>>,
    window_days: usize,
) -> Result<usize> {
    store::ensure_dir(results_dir)?;

    let csv_path = results_dir.join(RANKED_CSV_NAME);
    let mut writer = WriterBuilder::new().from_path(&csv_path)?;
    for summary in ranked {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    info!("Wrote ranked table to {}", csv_path.display());

    let mut pages = 0;
    for (page_index, chunk) in ranked.chunks(TICKERS_PER_PAGE).enumerate() {
        let path = results_dir.join(format!("ticker_growth_report_page_{}.svg", page_index + 1));
        render_chart_page(&path, chunk, histories, window_days)?;
        pages += 1;
    }
    info!("Wrote {} chart pages to {}", pages, results_dir.display());

    Ok(pages)
}

fn render_chart_page(
    path: &Path,
    chunk: &[GrowthSummary],
    histories: &BTreeMap<String, Vec<DailyRow>>,
    window_days: usize,
) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let cells = root.split_evenly((2, 2));
    for (cell, summary) in cells.iter().zip(chunk.iter()) {
        let rows = match histories.get(&summary.ticker) {
            Some(rows) if !rows.is_empty() => rows,
            _ => continue,
        };
        let tail = &rows[rows.len().saturating_sub(CHART_TAIL_ROWS)..];
        draw_ticker_panel(cell, summary, tail, window_days)?;
    }

    root.present()?;
    Ok(())
}

fn draw_ticker_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    summary: &GrowthSummary,
    tail: &[DailyRow],
    window_days: usize,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let first_date = tail[0].date;
    let mut last_date = tail[tail.len() - 1].date;
    if last_date == first_date {
        last_date = last_date + chrono::Duration::days(1);
    }

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for row in tail {
        y_min = y_min.min(row.adj_close);
        y_max = y_max.max(row.adj_close);
    }
    if y_min == y_max {
        y_min -= 1.0;
        y_max += 1.0;
    } else {
        let pad = (y_max - y_min) * 0.05;
        y_min -= pad;
        y_max += pad;
    }

    let caption = format!(
        "{} | {}D Growth: {:.2}%",
        summary.ticker,
        window_days,
        summary.growth_pct * 100.0
    );

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(56)
        .build_cartesian_2d(first_date..last_date, y_min..y_max)?;

    chart.configure_mesh().x_labels(5).y_labels(6).draw()?;

    chart.draw_series(
        LineSeries::new(tail.iter().map(|row| (row.date, row.adj_close)), &GREEN).point_size(2),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn history(ticker: &str, days: u32) -> (String, Vec<DailyRow>) {
        let rows = (1..=days)
            .map(|day| DailyRow {
                date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                ticker: ticker.to_string(),
                close: 10.0 + day as f64 * 0.1,
                adj_close: 10.0 + day as f64 * 0.1,
                volume: 1000,
                split_factor: 1.0,
                market_cap: None,
                enterprise_val: None,
                pe_ratio: None,
                pb_ratio: None,
                trailing_peg_1y: None,
            })
            .collect();
        (ticker.to_string(), rows)
    }

    fn summary(ticker: &str, growth_pct: f64) -> GrowthSummary {
        GrowthSummary {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            close: 12.0,
            volume: 1000,
            adj_close: 12.0,
            split_factor: 1.0,
            market_cap: Some(1.0e9),
            enterprise_val: None,
            pe_ratio: None,
            pb_ratio: None,
            trailing_peg_1y: None,
            growth_pct,
        }
    }

    #[test]
    fn test_report_writes_csv_and_paginated_charts() {
        let dir = tempdir().unwrap();
        let results_dir = dir.path().join("rank_results");

        let tickers = ["AAA", "BBB", "CCC", "DDD", "EEE"];
        let histories: BTreeMap<_, _> = tickers.iter().map(|t| history(t, 10)).collect();
        let ranked: Vec<_> = tickers.iter().map(|t| summary(t, 0.05)).collect();

        let pages = write_rank_report(&results_dir, &ranked, &histories, 5).unwrap();
        assert_eq!(pages, 2); // 4 tickers on page 1, 1 on page 2

        let csv = std::fs::read_to_string(results_dir.join(RANKED_CSV_NAME)).unwrap();
        assert_eq!(csv.lines().count(), 6); // header + 5 tickers
        assert!(csv.lines().next().unwrap().starts_with("ticker,date,close"));
        assert!(csv.contains("N/A"));

        let page_1 =
            std::fs::read_to_string(results_dir.join("ticker_growth_report_page_1.svg")).unwrap();
        assert!(page_1.contains("<svg"));
        assert!(page_1.contains("AAA | 5D Growth: 5.00%"));
        assert!(results_dir.join("ticker_growth_report_page_2.svg").exists());
        assert!(!results_dir.join("ticker_growth_report_page_3.svg").exists());
    }

    #[test]
    fn test_growth_pct_written_as_rounded_percentage() {
        let dir = tempdir().unwrap();
        let results_dir = dir.path().join("rank_results");

        let histories: BTreeMap<_, _> = [history("AAA", 10)].into_iter().collect();
        let ranked = vec![summary("AAA", 0.034567)];

        write_rank_report(&results_dir, &ranked, &histories, 5).unwrap();

        let csv = std::fs::read_to_string(results_dir.join(RANKED_CSV_NAME)).unwrap();
        let data_line = csv.lines().nth(1).unwrap();
        assert!(data_line.ends_with("3.46"), "line was: {}", data_line);
    }
}
