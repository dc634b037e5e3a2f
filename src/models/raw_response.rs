use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::{AppError, Result};

/// A single value as delivered by the provider, before numeric coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Interpret a textual cell (CSV field, JSON string)
    ///
    /// Empty text is `Missing`, anything that parses as a float is `Number`,
    /// everything else is kept as `Text` so the store can report it.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    /// Coerce to `f64`; missing and NaN values become `0.0`
    pub fn to_f64(&self) -> std::result::Result<f64, String> {
        match self {
            Cell::Missing => Ok(0.0),
            Cell::Number(value) if value.is_nan() => Ok(0.0),
            Cell::Number(value) => Ok(*value),
            Cell::Text(text) => match text.trim().parse::<f64>() {
                Ok(value) if value.is_nan() => Ok(0.0),
                Ok(value) => Ok(value),
                Err(_) => Err(format!("non-numeric value '{}'", text)),
            },
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Number)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Column label of a raw price table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabel {
    /// Single-level label, e.g. `"Close"` or `"AAPL"`
    Flat(String),
    /// Two-level label `(field, symbol)`, e.g. `("Close", "AAPL")`
    Hierarchical { field: String, symbol: String },
}

impl ColumnLabel {
    pub fn flat(name: impl Into<String>) -> Self {
        ColumnLabel::Flat(name.into())
    }

    pub fn hierarchical(field: impl Into<String>, symbol: impl Into<String>) -> Self {
        ColumnLabel::Hierarchical {
            field: field.into(),
            symbol: symbol.into(),
        }
    }

    pub fn is_hierarchical(&self) -> bool {
        matches!(self, ColumnLabel::Hierarchical { .. })
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLabel::Flat(name) => write!(f, "{}", name),
            ColumnLabel::Hierarchical { field, symbol } => write!(f, "({}, {})", field, symbol),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub label: ColumnLabel,
    pub cells: Vec<Cell>,
}

impl RawColumn {
    pub fn new(label: ColumnLabel, cells: Vec<Cell>) -> Self {
        Self { label, cells }
    }
}

/// Provider response for one ticker: a timestamp index plus labelled columns
///
/// Every column holds exactly one cell per index entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    index: Vec<DateTime<Utc>>,
    columns: Vec<RawColumn>,
}

impl RawResponse {
    pub fn new(index: Vec<DateTime<Utc>>, columns: Vec<RawColumn>) -> Result<Self> {
        for column in &columns {
            if column.cells.len() != index.len() {
                return Err(AppError::InvalidInput(format!(
                    "column {} has {} cells but the index has {} rows",
                    column.label,
                    column.cells.len(),
                    index.len()
                )));
            }
        }
        Ok(Self { index, columns })
    }

    /// Zero rows, zero columns
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn labels(&self) -> impl Iterator<Item = &ColumnLabel> {
        self.columns.iter().map(|c| &c.label)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn into_parts(self) -> (Vec<DateTime<Utc>>, Vec<RawColumn>) {
        (self.index, self.columns)
    }
}
