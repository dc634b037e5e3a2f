//! Saved price tables as a candle source
//!
//! Reads the CSV a dataframe library writes for a one-ticker download. The
//! first column is the bar time, the rest are values. With one header row
//! the labels are flat (`Datetime,Open,High,...` or `Datetime,AAPL,AAPL,...`);
//! with two header rows they are `(field, symbol)` pairs:
//!
//! ```text
//! Price,Close,High,Low,Open,Volume
//! Ticker,AAPL,AAPL,AAPL,AAPL,AAPL
//! Datetime,,,,,
//! 2025-01-01 14:30:00+00:00,104.0,105.0,99.0,100.0,1000
//! ```
//!
//! Label-only rows such as `Datetime,,,,,` are skipped.

use csv::{ReaderBuilder, StringRecord};
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Cell, ColumnLabel, RawColumn, RawResponse};
use crate::services::source::CandleSource;
use crate::utils::parse_timestamp;

/// Candle source backed by a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    header_rows: usize,
}

impl CsvFileSource {
    /// `header_rows` is 1 (flat labels) or 2 (hierarchical labels)
    pub fn new(path: impl Into<PathBuf>, header_rows: usize) -> Result<Self> {
        if !(1..=2).contains(&header_rows) {
            return Err(Error::InvalidInput(format!(
                "header_rows must be 1 or 2, got {}",
                header_rows
            )));
        }
        Ok(Self {
            path: path.into(),
            header_rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<RawResponse> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", self.path.display(), e)))?;

        let raw = read_raw_response(bytes.as_slice(), self.header_rows)?;
        info!(path = %self.path.display(), rows = raw.len(), columns = raw.columns().len(), "Loaded price table");
        Ok(raw)
    }
}

impl CandleSource for CsvFileSource {
    fn fetch_recent(&self, _ticker: &str) -> impl Future<Output = Result<RawResponse>> + Send {
        self.load()
    }
}

/// Parse a CSV price table into a raw response
pub fn read_raw_response<R: Read>(reader: R, header_rows: usize) -> Result<RawResponse> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();
    let mut headers: Vec<StringRecord> = Vec::with_capacity(header_rows);
    for _ in 0..header_rows {
        match records.next() {
            Some(record) => headers.push(record?),
            None => return Ok(RawResponse::empty()),
        }
    }

    let labels = build_labels(&headers)?;
    let width = labels.len();

    let mut index = Vec::new();
    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); width];

    for (offset, result) in records.enumerate() {
        let record = result?;
        let line = header_rows + offset + 1;

        let time_field = record.get(0).unwrap_or("");
        let values: Vec<&str> = record.iter().skip(1).collect();

        let time = match parse_timestamp(time_field) {
            Some(time) => time,
            None if values.iter().all(|v| v.trim().is_empty()) => {
                debug!(line, label = time_field, "Skipping label row");
                continue;
            }
            None => {
                return Err(Error::Parse(format!(
                    "line {}: invalid timestamp '{}'",
                    line, time_field
                )));
            }
        };

        if values.len() > width {
            return Err(Error::Parse(format!(
                "line {}: {} values but only {} columns",
                line,
                values.len(),
                width
            )));
        }

        index.push(time);
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(values.get(i).map_or(Cell::Missing, |v| Cell::parse(v)));
        }
    }

    let columns = labels
        .into_iter()
        .zip(cells)
        .map(|(label, cells)| RawColumn::new(label, cells))
        .collect();

    RawResponse::new(index, columns)
}

fn build_labels(headers: &[StringRecord]) -> Result<Vec<ColumnLabel>> {
    match headers {
        [flat] => Ok(flat.iter().skip(1).map(|s| ColumnLabel::flat(s.trim())).collect()),
        [fields, symbols] => {
            if fields.len() != symbols.len() {
                return Err(Error::Parse(format!(
                    "header rows differ in width: {} vs {}",
                    fields.len(),
                    symbols.len()
                )));
            }
            Ok(fields
                .iter()
                .zip(symbols.iter())
                .skip(1)
                .map(|(field, symbol)| ColumnLabel::hierarchical(field.trim(), symbol.trim()))
                .collect())
        }
        _ => Err(Error::InvalidInput(format!(
            "header_rows must be 1 or 2, got {}",
            headers.len()
        ))),
    }
}
