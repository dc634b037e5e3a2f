use std::future::Future;

use crate::error::Result;
use crate::models::RawResponse;

/// Provider of raw minute candles
///
/// Implementations return the most recent trading day of one-minute bars
/// for a single ticker, in whatever column layout the provider uses.
/// Timeouts are the implementation's concern; callers never retry.
pub trait CandleSource: Send + Sync {
    fn fetch_recent(&self, ticker: &str) -> impl Future<Output = Result<RawResponse>> + Send;
}
