use crate::cli::GlobalArgs;
use crate::services::CandleStore;
use crate::utils::format_number;

pub fn run(args: &GlobalArgs) {
    let config = match args.to_config(&[]) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };

    let store = CandleStore::new(config.database_path.clone());
    let counts = match super::runtime().block_on(store.counts_by_ticker()) {
        Ok(counts) => counts,
        Err(e) => super::exit_with("Failed to read counts", e),
    };

    println!("📊 Stored candles ({})\n", store.database_path().display());

    if counts.is_empty() {
        println!("⚠️  No candles stored yet. Run 'ingest' or 'run' first.");
        return;
    }

    for (ticker, count) in &counts {
        println!("   {:<12} {:>10}", ticker, format_number(*count));
    }
    println!("\n   {:<12} {:>10}", "Total", format_number(counts.values().sum()));
}
