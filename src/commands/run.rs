use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::services::{run_all, YahooClient};
use crate::utils::format_number;

pub fn run(args: &GlobalArgs) {
    let config = match args.to_config(&[]) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };
    let source = match YahooClient::new() {
        Ok(source) => Arc::new(source),
        Err(e) => super::exit_with("Failed to create chart client", e),
    };

    println!("🚀 Running pipeline for {}", config.tickers.join(", "));

    let summary = match super::runtime().block_on(run_all(source, &config)) {
        Ok(summary) => summary,
        Err(e) => super::exit_with("Run failed", e),
    };

    println!();
    for result in &summary.results {
        let icon = if result.is_success() { "✅" } else { "❌" };
        println!("{} {}", icon, result.describe());
    }

    println!("\n📊 Stored candles:");
    for (ticker, count) in &summary.counts {
        println!("   {:<12} {:>10}", ticker, format_number(*count));
    }

    if summary.failed() > 0 {
        std::process::exit(1);
    }
}
