use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::services::YahooClient;
use crate::worker;

pub fn run(args: &GlobalArgs) {
    let config = match args.to_config(&[]) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };
    let source = match YahooClient::new() {
        Ok(source) => Arc::new(source),
        Err(e) => super::exit_with("Failed to create chart client", e),
    };

    println!(
        "🔄 Starting worker: {} every {}s (Ctrl+C to stop)",
        config.tickers.join(", "),
        config.run_interval.as_secs()
    );

    super::runtime().block_on(async {
        tokio::select! {
            _ = worker::run_ingest_worker(source, config) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Worker stopped");
            }
        }
    });
}
