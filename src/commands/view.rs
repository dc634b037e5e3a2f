use crate::cli::GlobalArgs;
use crate::constants::{MA_LONG_PERIOD, MA_SHORT_PERIOD, VIEW_MAX_LIMIT, VIEW_MIN_LIMIT, VIEW_PREVIEW_ROWS};
use crate::error::Result;
use crate::models::{normalize_ticker, Candle};
use crate::services::{CandleStore, CandleSummary};

/// What `view` has to show
#[derive(Debug)]
enum ViewData {
    /// No ticker requested: the tickers that have data
    Tickers(Vec<String>),
    /// Requested ticker has no candles; `available` lists those that do
    NoData { ticker: String, available: Vec<String> },
    Candles {
        ticker: String,
        candles: Vec<Candle>,
        summary: CandleSummary,
    },
}

pub fn run(args: &GlobalArgs, ticker: Option<&str>, limit: u32) {
    let config = match args.to_config(&[]) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };
    let store = CandleStore::new(config.database_path.clone());
    let limit = clamp_limit(limit);

    let data = match super::runtime().block_on(load_view(&store, ticker, limit)) {
        Ok(data) => data,
        Err(e) => super::exit_with("Failed to load candles", e),
    };

    match data {
        ViewData::Tickers(tickers) => {
            println!("📋 Stored tickers ({})\n", store.database_path().display());
            print_tickers(&tickers);
        }
        ViewData::NoData { ticker, available } => {
            println!("⚠️  No data for {} in {}", ticker, store.database_path().display());
            print_tickers(&available);
        }
        ViewData::Candles {
            ticker,
            candles,
            summary,
        } => {
            println!("📈 {} (last {} candles)\n", ticker, limit);
            print_summary(&summary);
            print_preview(&candles);
        }
    }
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(VIEW_MIN_LIMIT, VIEW_MAX_LIMIT)
}

/// Newest `limit` candles, oldest first
async fn load_candles(store: &CandleStore, ticker: &str, limit: u32) -> Result<Vec<Candle>> {
    let mut candles = store.recent_candles(ticker, limit).await?;
    candles.sort_by_key(|c| c.ts);
    Ok(candles)
}

async fn load_view(store: &CandleStore, ticker: Option<&str>, limit: u32) -> Result<ViewData> {
    let ticker = match ticker {
        Some(ticker) => normalize_ticker(ticker),
        None => return Ok(ViewData::Tickers(store.tickers().await?)),
    };

    let candles = load_candles(store, &ticker, limit).await?;
    match CandleSummary::from_candles(&candles) {
        Some(summary) => Ok(ViewData::Candles {
            ticker,
            candles,
            summary,
        }),
        None => Ok(ViewData::NoData {
            ticker,
            available: store.tickers().await?,
        }),
    }
}

fn print_tickers(tickers: &[String]) {
    if tickers.is_empty() {
        println!("   No candles stored yet. Run 'ingest' or 'run' first.");
    } else {
        println!("   Available: {}", tickers.join(", "));
    }
}

fn print_summary(summary: &CandleSummary) {
    println!("   Candles:     {}", summary.count);
    println!("   Last price:  {:.2}", summary.last_price);
    println!("   Change:      {:+.2}%", summary.change_pct);
    println!("   Avg volume:  {:.0}", summary.avg_volume);
    println!("   High / Low:  {:.2} / {:.2}", summary.max_high, summary.min_low);
    println!("   Volatility:  {:.4}", summary.volatility);
    println!("   SMA{}:       {}", MA_SHORT_PERIOD, format_optional(summary.sma_short));
    println!("   SMA{}:       {}", MA_LONG_PERIOD, format_optional(summary.sma_long));
}

fn print_preview(candles: &[Candle]) {
    let start = candles.len().saturating_sub(VIEW_PREVIEW_ROWS);

    println!("\n   {:<20} {:>10} {:>10} {:>10} {:>10} {:>12}", "Time (UTC)", "Open", "High", "Low", "Close", "Volume");
    for candle in &candles[start..] {
        let time = candle
            .time()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| candle.ts.to_string());
        println!(
            "   {:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12.0}",
            time, candle.open, candle.high, candle.low, candle.close, candle.volume
        );
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}
