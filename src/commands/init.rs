use crate::cli::GlobalArgs;
use crate::services::CandleStore;

pub fn run(args: &GlobalArgs) {
    let config = match args.to_config(&[]) {
        Ok(config) => config,
        Err(e) => super::exit_with("Invalid configuration", e),
    };

    let store = CandleStore::new(config.database_path.clone());
    println!("🗄️  Database: {}", store.database_path().display());

    if let Err(e) = super::runtime().block_on(store.ensure_schema()) {
        super::exit_with("Failed to create schema", e);
    }

    println!("✅ candles table is ready");
}
