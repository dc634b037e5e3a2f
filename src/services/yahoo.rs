use chrono::{DateTime, TimeZone, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{FETCH_TIMEOUT_SECS, YAHOO_CHART_BASE_URL};
use crate::error::{Error, Result};
use crate::models::{Cell, ColumnLabel, RawColumn, RawResponse};
use crate::services::source::CandleSource;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

/// Parallel price arrays; `null` marks a minute the provider has no value for
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Client for the Yahoo Finance chart API
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(YAHOO_CHART_BASE_URL)
    }

    /// Client against a custom chart endpoint (proxies, test servers)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Invalid base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }
        let base_url = Url::parse(base_url).map_err(|e| Error::Config(format!("Invalid base_url '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(concat!("candle-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Request URL for one day of one-minute bars
    fn chart_url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base_url cannot take a path: {}", self.base_url)))?
            .push(ticker);
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1m");
        Ok(url)
    }

    /// Fetch the latest trading day of minute candles for `ticker`
    pub async fn fetch_chart(&self, ticker: &str) -> Result<RawResponse> {
        let url = self.chart_url(ticker)?;
        debug!(ticker = %ticker, url = %url, "Requesting chart");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Chart request failed for {}: {}", ticker, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{}: {}", ticker, chart_error_text(&body))));
        }
        if !status.is_success() {
            return Err(Error::Network(format!(
                "Chart API returned error status {} for {}: {}",
                status,
                ticker,
                chart_error_text(&body)
            )));
        }

        let raw = parse_chart_response(ticker, &body)?;
        info!(ticker = %ticker, rows = raw.len(), "Fetched chart");
        Ok(raw)
    }
}

impl CandleSource for YahooClient {
    fn fetch_recent(&self, ticker: &str) -> impl Future<Output = Result<RawResponse>> + Send {
        self.fetch_chart(ticker)
    }
}

/// Decode a chart API body into a raw response with field-named columns
pub fn parse_chart_response(ticker: &str, body: &str) -> Result<RawResponse> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("Failed to parse chart JSON: {}", e)))?;

    if let Some(err) = envelope.chart.error {
        let description = err.description.unwrap_or_default();
        return Err(if err.code.eq_ignore_ascii_case("not found") {
            Error::NotFound(format!("{}: {}", ticker, description))
        } else {
            Error::Network(format!("Chart API error for {}: {} {}", ticker, err.code, description))
        });
    }

    let result = match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(RawResponse::empty()),
    };

    if result.timestamp.is_empty() {
        return Ok(RawResponse::empty());
    }

    let index = result
        .timestamp
        .iter()
        .map(|ts| {
            Utc.timestamp_opt(*ts, 0)
                .single()
                .ok_or_else(|| Error::Parse(format!("Invalid timestamp {} in chart response", ts)))
        })
        .collect::<Result<Vec<DateTime<Utc>>>>()?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let fields = [
        ("Open", quote.open),
        ("High", quote.high),
        ("Low", quote.low),
        ("Close", quote.close),
        ("Volume", quote.volume),
    ];

    // Absent arrays are left out; normalization zero-fills them
    let columns = fields
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| RawColumn::new(ColumnLabel::flat(name), values.into_iter().map(Cell::from).collect()))
        .collect();

    RawResponse::new(index, columns).map_err(|e| Error::Parse(format!("Malformed chart response for {}: {}", ticker, e)))
}

fn chart_error_text(body: &str) -> String {
    serde_json::from_str::<ChartEnvelope>(body)
        .ok()
        .and_then(|env| env.chart.error)
        .map(|err| format!("{} {}", err.code, err.description.unwrap_or_default()))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "currency": "USD"},
                "timestamp": [1735689600, 1735689660],
                "indicators": {
                    "quote": [{
                        "open": [100.0, 104.0],
                        "high": [105.0, null],
                        "low": [99.0, 103.0],
                        "close": [104.0, 105.5],
                        "volume": [1000, 1200]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_response() {
        let raw = parse_chart_response("AAPL", BODY).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.index()[0].timestamp(), 1_735_689_600);

        let labels: Vec<String> = raw.labels().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["Open", "High", "Low", "Close", "Volume"]);

        let high = &raw.columns()[1].cells;
        assert_eq!(high, &vec![Cell::Number(105.0), Cell::Missing]);
        assert_eq!(raw.columns()[4].cells[1], Cell::Number(1200.0));
    }

    #[test]
    fn test_parse_chart_missing_arrays() {
        let body = r#"{"chart":{"result":[{"timestamp":[1735689600],"indicators":{"quote":[{"close":[1.5]}]}}],"error":null}}"#;
        let raw = parse_chart_response("BTC-USD", body).unwrap();
        assert_eq!(raw.columns().len(), 1);
        assert_eq!(raw.columns()[0].label, ColumnLabel::flat("Close"));
    }

    #[test]
    fn test_parse_chart_without_bars() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart_response("MSFT", body).unwrap().is_empty());

        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse_chart_response("MSFT", body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart_response("ZZZZ", body), Err(Error::NotFound(_))));

        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse_chart_response("ZZZZ", body), Err(Error::Network(_))));
    }

    #[test]
    fn test_parse_chart_garbage() {
        assert!(matches!(parse_chart_response("AAPL", "<html>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_ragged_arrays_rejected() {
        let body = r#"{"chart":{"result":[{"timestamp":[1,2],"indicators":{"quote":[{"close":[1.5]}]}}],"error":null}}"#;
        assert!(matches!(parse_chart_response("AAPL", body), Err(Error::Parse(_))));
    }

    #[test]
    fn test_chart_url() {
        let client = YahooClient::with_base_url("https://example.com/v8/finance/chart/").unwrap();
        let url = client.chart_url("BTC-USD").unwrap();
        assert_eq!(url.as_str(), "https://example.com/v8/finance/chart/BTC-USD?range=1d&interval=1m");

        assert!(matches!(YahooClient::with_base_url("ftp://example.com"), Err(Error::Config(_))));
    }
}
