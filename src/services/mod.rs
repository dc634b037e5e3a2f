pub mod candle_stats;
pub mod csv_source;
pub mod database;
pub mod ingestion;
pub mod normalizer;
pub mod recency;
pub mod source;
pub mod yahoo;

pub use candle_stats::{calculate_sma, CandleSummary};
pub use csv_source::CsvFileSource;
pub use database::CandleStore;
pub use ingestion::{ingest_ticker, ingest_ticker_at, run_all, RunSummary, TickerResult};
pub use normalizer::{classify, normalize, ResponseShape};
pub use recency::filter_recent;
pub use source::CandleSource;
pub use yahoo::YahooClient;
