//! Schema normalization for raw provider responses
//!
//! Providers label their price columns in one of three ways. The layout is
//! classified first, then every recognized column is mapped onto the
//! canonical `open, high, low, close, volume` set:
//!
//! | Shape                | Labels                               | Mapping                 |
//! |----------------------|--------------------------------------|-------------------------|
//! | `Hierarchical`       | `("Close", "AAPL")` pairs            | field part, lower-cased |
//! | `PositionalBySymbol` | five labels all equal to the ticker  | by position             |
//! | `NamedFlat`          | `"Close"`, `"close"`, `"CLOSE"`, ... | lower-cased label       |
//!
//! Anything else is rejected with `AppError::SchemaAmbiguity` rather than
//! guessed at. Canonical columns that are still absent after mapping are
//! filled with `0.0`.

use tracing::debug;

use crate::constants::CANONICAL_COLUMNS;
use crate::error::{AppError, Result};
use crate::models::{Cell, ColumnLabel, NormalizedRow, NormalizedTable, RawResponse};

/// Recognized raw column layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Hierarchical,
    PositionalBySymbol,
    NamedFlat,
}

/// Classify a label set; the checks run in a fixed order
pub fn classify(ticker: &str, labels: &[ColumnLabel]) -> Result<ResponseShape> {
    if labels.is_empty() {
        return Err(ambiguity(ticker, "response has rows but no columns".to_string()));
    }

    let hierarchical = labels.iter().filter(|l| l.is_hierarchical()).count();
    if hierarchical == labels.len() {
        return Ok(ResponseShape::Hierarchical);
    }
    if hierarchical > 0 {
        return Err(ambiguity(
            ticker,
            format!("{} of {} columns are hierarchical", hierarchical, labels.len()),
        ));
    }

    let ticker = ticker.trim();
    let all_symbol = labels.iter().all(|l| match l {
        ColumnLabel::Flat(name) => name.trim().eq_ignore_ascii_case(ticker),
        ColumnLabel::Hierarchical { .. } => false,
    });
    if labels.len() == CANONICAL_COLUMNS.len() && all_symbol {
        return Ok(ResponseShape::PositionalBySymbol);
    }

    let any_named = labels.iter().any(|l| match l {
        ColumnLabel::Flat(name) => canonical_name(name).is_some(),
        ColumnLabel::Hierarchical { .. } => false,
    });
    if any_named {
        return Ok(ResponseShape::NamedFlat);
    }

    Err(ambiguity(
        ticker,
        format!("no column names a price field: [{}]", join_labels(labels)),
    ))
}

/// Convert a raw response into the canonical five-column table
pub fn normalize(ticker: &str, raw: RawResponse) -> Result<NormalizedTable> {
    if raw.is_empty() {
        debug!(ticker = %ticker, "Empty response, nothing to normalize");
        return Ok(NormalizedTable::empty());
    }

    let labels: Vec<ColumnLabel> = raw.labels().cloned().collect();
    let shape = classify(ticker, &labels)?;
    let (index, columns) = raw.into_parts();
    let row_count = index.len();

    let mut slots: [Option<Vec<Cell>>; 5] = Default::default();

    match shape {
        ResponseShape::PositionalBySymbol => {
            for (slot, column) in slots.iter_mut().zip(columns) {
                *slot = Some(column.cells);
            }
        }
        ResponseShape::Hierarchical | ResponseShape::NamedFlat => {
            for column in columns {
                let name = match &column.label {
                    ColumnLabel::Hierarchical { field, .. } => field,
                    ColumnLabel::Flat(name) => name,
                };
                match canonical_position(name) {
                    Some(pos) if slots[pos].is_some() => {
                        return Err(ambiguity(
                            ticker,
                            format!("field '{}' appears more than once", CANONICAL_COLUMNS[pos]),
                        ));
                    }
                    Some(pos) => slots[pos] = Some(column.cells),
                    None => {
                        debug!(ticker = %ticker, column = %column.label, "Dropping non-price column");
                    }
                }
            }

            if slots.iter().all(Option::is_none) {
                return Err(ambiguity(
                    ticker,
                    format!("no column names a price field: [{}]", join_labels(&labels)),
                ));
            }
        }
    }

    let missing: Vec<&str> = CANONICAL_COLUMNS
        .iter()
        .zip(slots.iter())
        .filter(|(_, slot)| slot.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        debug!(ticker = %ticker, missing = ?missing, "Filling absent columns with 0.0");
    }

    let [open, high, low, close, volume] =
        slots.map(|slot| slot.unwrap_or_else(|| vec![Cell::Number(0.0); row_count]));

    let rows = index
        .into_iter()
        .zip(open)
        .zip(high)
        .zip(low)
        .zip(close)
        .zip(volume)
        .map(|(((((time, o), h), l), c), v)| NormalizedRow::new(time, o, h, l, c, v))
        .collect();

    debug!(ticker = %ticker, shape = ?shape, rows = row_count, "Normalized response");
    Ok(NormalizedTable::new(rows))
}

/// Canonical column for a label, matched case-insensitively
pub fn canonical_name(label: &str) -> Option<&'static str> {
    canonical_position(label).map(|pos| CANONICAL_COLUMNS[pos])
}

fn canonical_position(label: &str) -> Option<usize> {
    let lower = label.trim().to_lowercase();
    CANONICAL_COLUMNS.iter().position(|c| *c == lower)
}

fn join_labels(labels: &[ColumnLabel]) -> String {
    labels.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}

fn ambiguity(ticker: &str, reason: String) -> AppError {
    AppError::SchemaAmbiguity {
        ticker: ticker.to_string(),
        reason,
    }
}
