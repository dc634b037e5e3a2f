use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One stored OHLCV bar, as laid out in the `candles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candle {
    /// Uppercase ticker symbol
    pub ticker: String,

    /// Bar open time, epoch seconds (UTC)
    pub ts: i64,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Traded volume (zero when the source omitted it)
    pub volume: f64,
}

impl Candle {
    pub fn new(
        ticker: impl Into<String>,
        ts: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar time as a UTC datetime
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.ts, 0).single()
    }
}

/// Canonical form of a ticker symbol: trimmed and upper-cased
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl "), "AAPL");
        assert_eq!(normalize_ticker("btc-usd"), "BTC-USD");
    }

    #[test]
    fn test_candle_time() {
        let candle = Candle::new("AAPL", 1_735_689_600, 1.0, 1.0, 1.0, 1.0, 0.0);
        assert_eq!(candle.time().unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
