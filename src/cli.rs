use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::commands;
use crate::constants::{DEFAULT_LOOKBACK_MINUTES, DEFAULT_RUN_INTERVAL_SECS, VIEW_DEFAULT_LIMIT};
use crate::error::Result;
use crate::models::PipelineConfig;
use crate::utils::get_database_path;

#[derive(Parser)]
#[command(name = "candle-pipeline")]
#[command(about = "Minute candle ingestion into SQLite", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every subcommand; flags override environment variables
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// SQLite database file (falls back to DB_PATH, then data/market_data.db)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Comma-separated tickers, e.g. AAPL,MSFT,BTC-USD
    #[arg(long, env = "TICKERS", global = true)]
    pub tickers: Option<String>,

    /// Only rows newer than this many minutes are stored
    #[arg(long, env = "LOOKBACK_MINUTES", default_value_t = DEFAULT_LOOKBACK_MINUTES, global = true)]
    pub lookback_minutes: u32,

    /// Seconds between worker runs
    #[arg(long, env = "RUN_INTERVAL_SECS", default_value_t = DEFAULT_RUN_INTERVAL_SECS, global = true)]
    pub interval_secs: u64,
}

impl GlobalArgs {
    /// Build the run configuration, preferring `tickers` over the configured list
    pub fn to_config(&self, tickers: &[String]) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();
        let tickers = if !tickers.is_empty() {
            tickers.to_vec()
        } else if let Some(list) = &self.tickers {
            PipelineConfig::parse_tickers(list)
        } else {
            defaults.tickers
        };

        PipelineConfig::new(
            self.db_path.clone().unwrap_or_else(get_database_path),
            tickers,
            self.lookback_minutes,
            Duration::from_secs(self.interval_secs),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the candles table if it does not exist
    Init,
    /// Fetch and store recent candles for the given tickers
    Ingest {
        /// Tickers to ingest (defaults to the configured list)
        tickers: Vec<String>,

        /// Read candles from a saved CSV table instead of the chart API
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Header rows in the CSV file: 1 (flat) or 2 (field + symbol)
        #[arg(long, default_value_t = 2)]
        header_rows: usize,
    },
    /// Run the pipeline once for every configured ticker
    Run,
    /// Run the pipeline repeatedly on the configured interval
    Worker,
    /// Show stored candle counts per ticker
    Counts,
    /// Show summary statistics and the latest candles for a ticker, or list stored tickers
    View {
        /// Ticker to show; omit to list the tickers that have data
        ticker: Option<String>,

        /// Number of most recent candles to load (50-2000)
        #[arg(short, long, default_value_t = VIEW_DEFAULT_LIMIT)]
        limit: u32,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            commands::init::run(&cli.global);
        }
        Commands::Ingest {
            tickers,
            file,
            header_rows,
        } => {
            commands::ingest::run(&cli.global, tickers, file, header_rows);
        }
        Commands::Run => {
            commands::run::run(&cli.global);
        }
        Commands::Worker => {
            commands::worker::run(&cli.global);
        }
        Commands::Counts => {
            commands::counts::run(&cli.global);
        }
        Commands::View { ticker, limit } => {
            commands::view::run(&cli.global, ticker.as_deref(), limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_args() {
        let cli = Cli::try_parse_from([
            "candle-pipeline",
            "ingest",
            "aapl",
            "--file",
            "aapl.csv",
            "--header-rows",
            "1",
            "--db-path",
            "/tmp/test.db",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest {
                tickers,
                file,
                header_rows,
            } => {
                assert_eq!(tickers, vec!["aapl"]);
                assert_eq!(file, Some(PathBuf::from("aapl.csv")));
                assert_eq!(header_rows, 1);
            }
            _ => panic!("expected ingest"),
        }

        let config = cli.global.to_config(&["aapl".to_string()]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.tickers, vec!["AAPL"]);
    }

    #[test]
    fn test_explicit_ticker_list() {
        let cli = Cli::try_parse_from(["candle-pipeline", "--tickers", "msft, btc-usd", "run"]).unwrap();
        let config = cli.global.to_config(&[]).unwrap();
        assert_eq!(config.tickers, vec!["MSFT", "BTC-USD"]);

        let cli = Cli::try_parse_from(["candle-pipeline", "--tickers", " , ", "run"]).unwrap();
        assert!(cli.global.to_config(&[]).is_err());
    }

    #[test]
    fn test_view_default_limit() {
        let cli = Cli::try_parse_from(["candle-pipeline", "view", "AAPL"]).unwrap();
        match cli.command {
            Commands::View { ticker, limit } => {
                assert_eq!(ticker.as_deref(), Some("AAPL"));
                assert_eq!(limit, VIEW_DEFAULT_LIMIT);
            }
            _ => panic!("expected view"),
        }

        let cli = Cli::try_parse_from(["candle-pipeline", "view"]).unwrap();
        assert!(matches!(cli.command, Commands::View { ticker: None, .. }));
    }
}
