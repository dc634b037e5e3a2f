//! Pipeline Constants
//!
//! Canonical column layout of the `candles` table and the documented defaults
//! used when no configuration overrides them.
//!
//! ## Canonical Columns
//!
//! Every normalized price table exposes exactly these five value columns, in
//! this order: `open, high, low, close, volume`. The same order is used when
//! a provider labels all five columns with the ticker symbol and position is
//! the only thing that identifies a field.

/// Canonical value columns, in positional order
pub const CANONICAL_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Name of the persisted candle table
pub const CANDLES_TABLE: &str = "candles";

/// Default SQLite database location (relative to the working directory)
pub const DEFAULT_DB_PATH: &str = "data/market_data.db";

/// Default ticker list
pub const DEFAULT_TICKERS: &[&str] = &["AAPL", "MSFT", "BTC-USD"];

/// Default recency window in minutes
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 60;

/// Default delay between scheduled runs (every five minutes)
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 300;

/// How long a writer waits on a locked database before giving up
pub const DB_BUSY_TIMEOUT_SECS: u64 = 30;

/// Viewer row limits
///
/// | Setting | Value |
/// |---------|-------|
/// | default | 500   |
/// | minimum | 50    |
/// | maximum | 2000  |
pub const VIEW_DEFAULT_LIMIT: u32 = 500;
pub const VIEW_MIN_LIMIT: u32 = 50;
pub const VIEW_MAX_LIMIT: u32 = 2000;

/// Number of trailing candles printed by the viewer
pub const VIEW_PREVIEW_ROWS: usize = 20;

/// Moving average periods shown by the viewer
pub const MA_SHORT_PERIOD: usize = 20;
pub const MA_LONG_PERIOD: usize = 50;

/// Yahoo Finance chart endpoint
pub const YAHOO_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Request timeout for the market-data provider
pub const FETCH_TIMEOUT_SECS: u64 = 30;
