use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use growth_screener::api::TiingoClient;
use growth_screener::models::{Config, DataPaths};
use growth_screener::ranker::{self, RankParams};
use growth_screener::pipeline;

#[derive(Parser)]
#[command(name = "growth-screener", about = "Tiingo ETL and short-window growth screener")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the active-ticker metadata CSV from the Tiingo meta endpoint
    FetchMeta,
    /// Fetch daily price and fundamentals series, merge and persist per-ticker CSVs
    FetchDaily,
    /// Rank tickers by trailing-window growth and write the report
    Rank {
        /// Trailing number of rows used for the growth calculation
        #[arg(long, default_value_t = 5)]
        window_days: usize,
        /// Minimum latest close for a ticker to qualify
        #[arg(long, default_value_t = 5.0)]
        min_price: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "growth_screener=info".to_string()),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Command::FetchMeta => {
            let config = load_config()?;
            let client = TiingoClient::new(&config)?;
            let active = pipeline::refresh_meta(&config, &client).await?;
            println!("Saved {} active tickers to {}", active, config.paths.meta_csv.display());
        }
        Command::FetchDaily => {
            let config = load_config()?;
            let client = TiingoClient::new(&config)?;
            let summary = pipeline::fetch_and_merge(&config, &client).await?;
            println!(
                "Wrote {} ticker files to {}",
                summary.written,
                config.paths.daily_data_dir.display()
            );
            if !summary.missing.is_empty() {
                println!("MISSING TICKERS: {:?}", summary.missing_tickers());
            }
        }
        Command::Rank { window_days, min_price } => {
            let paths = DataPaths::from_env();
            let params = RankParams {
                window_days,
                min_price,
                ..RankParams::default()
            };
            match ranker::run(&paths.daily_data_dir, &paths.results_dir, &params)? {
                ranker::RankOutcome::NoValidFiles => {
                    println!("No valid price history files found.");
                }
                ranker::RankOutcome::NoMatches => {
                    println!("No tickers found matching the criteria.");
                }
                ranker::RankOutcome::Written { tickers, pages } => {
                    println!(
                        "Ranked {} tickers; report written to {} ({} chart pages)",
                        tickers,
                        paths.results_dir.display(),
                        pages
                    );
                }
            }
        }
    }

    Ok(())
}

/// Load configuration, aborting with a readable message when the credential
/// is missing. No request should ever leave the process without a token.
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            eprintln!("Make sure you have a .env file with API_KEY set to your Tiingo token.");
            std::process::exit(1);
        }
    }
}
