use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_LOOKBACK_MINUTES, DEFAULT_RUN_INTERVAL_SECS, DEFAULT_TICKERS};
use crate::error::{AppError, Result};
use crate::models::normalize_ticker;

/// Configuration for an ingestion run
///
/// Passed explicitly into every operation; nothing here is process-global.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Uppercase, de-duplicated ticker symbols
    pub tickers: Vec<String>,

    /// Recency window applied before storing
    pub lookback_minutes: u32,

    /// Delay between scheduled runs
    pub run_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
            run_interval: Duration::from_secs(DEFAULT_RUN_INTERVAL_SECS),
        }
    }
}

impl PipelineConfig {
    /// Create new config with custom values
    pub fn new(
        database_path: PathBuf,
        tickers: Vec<String>,
        lookback_minutes: u32,
        run_interval: Duration,
    ) -> Result<Self> {
        let tickers = Self::clean_tickers(tickers);
        if tickers.is_empty() {
            return Err(AppError::Config("at least one ticker is required".to_string()));
        }

        Ok(Self {
            database_path,
            tickers,
            lookback_minutes,
            run_interval,
        })
    }

    /// Parse a comma-separated ticker list ("aapl, msft,,BTC-USD")
    pub fn parse_tickers(s: &str) -> Vec<String> {
        Self::clean_tickers(s.split(',').map(|t| t.to_string()).collect())
    }

    /// Trim, upper-case, drop blanks and repeats (first occurrence wins)
    fn clean_tickers(tickers: Vec<String>) -> Vec<String> {
        let mut cleaned: Vec<String> = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let ticker = normalize_ticker(&ticker);
            if !ticker.is_empty() && !cleaned.contains(&ticker) {
                cleaned.push(ticker);
            }
        }
        cleaned
    }
}
