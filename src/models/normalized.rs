use chrono::{DateTime, Utc};

use crate::constants::CANONICAL_COLUMNS;
use crate::models::{Candle, Cell};

/// One row of a normalized table: the bar time plus the five canonical cells
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub time: DateTime<Utc>,
    pub open: Cell,
    pub high: Cell,
    pub low: Cell,
    pub close: Cell,
    pub volume: Cell,
}

impl NormalizedRow {
    pub fn new(time: DateTime<Utc>, open: Cell, high: Cell, low: Cell, close: Cell, volume: Cell) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Row built from plain numbers
    pub fn from_values(time: DateTime<Utc>, values: [f64; 5]) -> Self {
        let [open, high, low, close, volume] = values;
        Self::new(time, open.into(), high.into(), low.into(), close.into(), volume.into())
    }

    /// Cell for a canonical column name
    pub fn field(&self, name: &str) -> Option<&Cell> {
        match name {
            "open" => Some(&self.open),
            "high" => Some(&self.high),
            "low" => Some(&self.low),
            "close" => Some(&self.close),
            "volume" => Some(&self.volume),
            _ => None,
        }
    }

    /// Epoch seconds of the bar time
    pub fn epoch_seconds(&self) -> i64 {
        self.time.timestamp()
    }

    /// Coerce every cell to `f64` and build the candle to persist
    ///
    /// The error names the first column that could not be converted.
    pub fn to_candle(&self, ticker: &str) -> Result<Candle, String> {
        let mut values = [0.0f64; 5];
        for (slot, name) in values.iter_mut().zip(CANONICAL_COLUMNS) {
            let cell = self.field(name).unwrap_or(&Cell::Missing);
            *slot = cell.to_f64().map_err(|e| format!("{}: {}", name, e))?;
        }
        let [open, high, low, close, volume] = values;
        Ok(Candle::new(ticker, self.epoch_seconds(), open, high, low, close, volume))
    }
}

/// Price table with exactly the canonical columns, indexed by bar time
///
/// The column set is fixed by construction, so an empty table still exposes
/// all five columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn new(rows: Vec<NormalizedRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> [&'static str; 5] {
        CANONICAL_COLUMNS
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<NormalizedRow> {
        self.rows
    }

    pub fn index(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.time).collect()
    }

    /// All cells of one canonical column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        if !CANONICAL_COLUMNS.contains(&name) {
            return None;
        }
        Some(self.rows.iter().filter_map(|r| r.field(name)).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last `n` rows, for debug output
    pub fn tail(&self, n: usize) -> &[NormalizedRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_table_keeps_columns() {
        let table = NormalizedTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["open", "high", "low", "close", "volume"]);
        assert_eq!(table.column("close"), Some(vec![]));
        assert_eq!(table.column("adj close"), None);
    }

    #[test]
    fn test_to_candle() {
        let row = NormalizedRow::from_values(t0(), [100.0, 105.0, 99.0, 104.0, 1000.0]);
        let candle = row.to_candle("AAPL").unwrap();
        assert_eq!(candle, Candle::new("AAPL", 1_735_689_600, 100.0, 105.0, 99.0, 104.0, 1000.0));
    }

    #[test]
    fn test_to_candle_reports_bad_column() {
        let row = NormalizedRow::new(
            t0(),
            Cell::Number(1.0),
            Cell::Text("oops".to_string()),
            Cell::Number(1.0),
            Cell::Missing,
            Cell::Missing,
        );
        let err = row.to_candle("AAPL").unwrap_err();
        assert!(err.starts_with("high:"), "unexpected reason: {}", err);
    }

    #[test]
    fn test_tail() {
        let rows = (0..5)
            .map(|i| NormalizedRow::from_values(t0() + chrono::Duration::minutes(i), [i as f64; 5]))
            .collect();
        let table = NormalizedTable::new(rows);
        assert_eq!(table.tail(2).len(), 2);
        assert_eq!(table.tail(2)[0].open, Cell::Number(3.0));
        assert_eq!(table.tail(10).len(), 5);
    }
}
