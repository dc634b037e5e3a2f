use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::error::Error;
use crate::models::IngestReport;
use crate::services::{ingest_ticker, CandleSource, CandleStore, CsvFileSource, YahooClient};

pub fn run(args: &GlobalArgs, tickers: Vec<String>, file: Option<PathBuf>, header_rows: usize) {
    let config = match args.to_config(&tickers) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };
    let store = CandleStore::new(config.database_path.clone());

    println!("📥 Ingesting {} ticker(s) into {}", config.tickers.len(), store.database_path().display());
    println!("   Lookback: {} minutes", config.lookback_minutes);

    let runtime = super::runtime();
    let failed = match file {
        Some(path) => {
            if config.tickers.len() != 1 {
                eprintln!("❌ --file holds one ticker's table; pass exactly one ticker");
                std::process::exit(1);
            }
            let source = match CsvFileSource::new(&path, header_rows) {
                Ok(source) => source,
                Err(e) => super::exit_with("Invalid CSV source", e),
            };
            println!("   Source: {}", source.path().display());
            runtime.block_on(ingest_each(&source, &store, &config.tickers, config.lookback_minutes))
        }
        None => {
            let source = match YahooClient::new() {
                Ok(source) => source,
                Err(e) => super::exit_with("Failed to create chart client", e),
            };
            runtime.block_on(ingest_each(&source, &store, &config.tickers, config.lookback_minutes))
        }
    };

    if failed > 0 {
        eprintln!("\n❌ {} of {} ticker(s) failed", failed, config.tickers.len());
        std::process::exit(1);
    }
    println!("\n✅ Ingest completed");
}

/// Ingest tickers one after another, returning the number that failed
async fn ingest_each<S: CandleSource>(source: &S, store: &CandleStore, tickers: &[String], lookback_minutes: u32) -> usize {
    let mut failed = 0;
    for ticker in tickers {
        match ingest_ticker(source, store, ticker, lookback_minutes).await {
            Ok(report) => print_report(&report),
            Err(e) => {
                failed += 1;
                print_failure(ticker, &e);
            }
        }
    }
    failed
}

fn print_report(report: &IngestReport) {
    let upsert = &report.upsert;
    println!(
        "\n🔹 {}: fetched {}, recent {}, attempted {} (new {}, existing {}, skipped {})",
        report.ticker, report.fetched, report.recent, upsert.attempted, upsert.inserted, upsert.ignored, upsert.skipped
    );
    for (ts, reason) in upsert.skipped_rows() {
        println!("   ⚠️  skipped ts={}: {}", ts, reason);
    }
}

fn print_failure(ticker: &str, e: &Error) {
    eprintln!("\n❌ {}: {}", ticker, e);
}
