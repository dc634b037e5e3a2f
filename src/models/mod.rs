mod candle;
mod ingest_report;
mod normalized;
mod pipeline_config;
mod raw_response;

pub use candle::{normalize_ticker, Candle};
pub use ingest_report::{IngestReport, RowOutcome, UpsertReport};
pub use normalized::{NormalizedRow, NormalizedTable};
pub use pipeline_config::PipelineConfig;
pub use raw_response::{Cell, ColumnLabel, RawColumn, RawResponse};

use std::collections::BTreeMap;

/// Stored candle count per ticker
pub type TickerCounts = BTreeMap<String, i64>;
