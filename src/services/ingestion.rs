use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::models::{normalize_ticker, IngestReport, PipelineConfig, TickerCounts};
use crate::services::database::CandleStore;
use crate::services::normalizer::normalize;
use crate::services::recency::filter_recent;
use crate::services::source::CandleSource;

/// Fetch, normalize, filter and store one ticker's recent candles
///
/// The returned report's `attempted()` is the number of rows handed to the
/// store after the recency filter, not the number newly created. The store
/// creates its table on the first insert.
pub async fn ingest_ticker<S: CandleSource>(
    source: &S,
    store: &CandleStore,
    ticker: &str,
    lookback_minutes: u32,
) -> Result<IngestReport> {
    ingest_ticker_at(source, store, ticker, lookback_minutes, Utc::now()).await
}

/// `ingest_ticker` with an explicit reference time for the recency cutoff
#[instrument(skip(source, store, now), fields(ticker = %ticker))]
pub async fn ingest_ticker_at<S: CandleSource>(
    source: &S,
    store: &CandleStore,
    ticker: &str,
    lookback_minutes: u32,
    now: DateTime<Utc>,
) -> Result<IngestReport> {
    let ticker = normalize_ticker(ticker);

    let raw = source.fetch_recent(&ticker).await?;
    let fetched = raw.len();

    let table = normalize(&ticker, raw)?;
    debug!(columns = ?table.columns(), rows = table.len(), "Normalized columns");

    let recent = filter_recent(table, lookback_minutes, now);
    if recent.is_empty() {
        info!(fetched, lookback_minutes, "No recent rows to store");
    } else {
        for row in recent.tail(5) {
            debug!(time = %row.time.to_rfc3339(), close = ?row.close, "Recent row");
        }
    }

    let upsert = store.upsert(&ticker, &recent).await?;
    info!(
        fetched,
        recent = recent.len(),
        attempted = upsert.attempted,
        inserted = upsert.inserted,
        skipped = upsert.skipped,
        "Ticker ingested"
    );

    Ok(IngestReport {
        ticker,
        fetched,
        recent: recent.len(),
        upsert,
    })
}

/// Per-ticker result of a scheduled run
#[derive(Debug, Clone, Serialize)]
pub struct TickerResult {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TickerResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// "AAPL: 42 rows" or "AAPL: failed (...)"
    pub fn describe(&self) -> String {
        match (&self.report, &self.error) {
            (_, Some(err)) => format!("{}: failed ({})", self.ticker, err),
            (Some(report), None) => format!("{}: {} rows", self.ticker, report.attempted()),
            (None, None) => format!("{}: no result", self.ticker),
        }
    }
}

/// Outcome of one scheduled run over all configured tickers
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<TickerResult>,
    pub counts: TickerCounts,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Run the pipeline once for every configured ticker
///
/// Tickers run as independent tasks; a failing ticker is reported in the
/// summary and does not stop the others. Only schema creation and the final
/// count query can fail the run as a whole.
pub async fn run_all<S>(source: Arc<S>, config: &PipelineConfig) -> Result<RunSummary>
where
    S: CandleSource + 'static,
{
    let started = Instant::now();
    let store = CandleStore::new(config.database_path.clone());
    store.ensure_schema().await?;

    let mut handles = Vec::with_capacity(config.tickers.len());
    for ticker in &config.tickers {
        let source = Arc::clone(&source);
        let store = store.clone();
        let task_ticker = ticker.clone();
        let lookback = config.lookback_minutes;

        let handle = tokio::spawn(async move { ingest_ticker(&*source, &store, &task_ticker, lookback).await });
        handles.push((ticker.clone(), handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (ticker, handle) in handles {
        let result = match handle.await {
            Ok(Ok(report)) => TickerResult {
                ticker,
                report: Some(report),
                error: None,
            },
            Ok(Err(e)) => {
                error!(ticker = %ticker, error = %e, "Ticker ingestion failed");
                TickerResult {
                    ticker,
                    report: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                error!(ticker = %ticker, error = %e, "Ticker task aborted");
                TickerResult {
                    ticker,
                    report: None,
                    error: Some(format!("task aborted: {}", e)),
                }
            }
        };
        results.push(result);
    }

    let counts = store.counts_by_ticker().await?;
    info!(
        tickers = results.len(),
        failed = results.iter().filter(|r| !r.is_success()).count(),
        counts = ?counts,
        duration_secs = started.elapsed().as_secs_f64(),
        "Run completed"
    );

    Ok(RunSummary { results, counts })
}
