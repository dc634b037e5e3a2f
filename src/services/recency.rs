use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::NormalizedTable;

/// Oldest bar time kept for a lookback window ending at `now`
pub fn cutoff(now: DateTime<Utc>, lookback_minutes: u32) -> DateTime<Utc> {
    now - Duration::minutes(i64::from(lookback_minutes))
}

/// Keep rows with `time >= now - lookback_minutes`, preserving row order
pub fn filter_recent(table: NormalizedTable, lookback_minutes: u32, now: DateTime<Utc>) -> NormalizedTable {
    let cutoff = cutoff(now, lookback_minutes);
    let before = table.len();

    let rows: Vec<_> = table
        .into_rows()
        .into_iter()
        .filter(|row| row.time >= cutoff)
        .collect();

    debug!(
        cutoff = %cutoff.to_rfc3339(),
        kept = rows.len(),
        dropped = before - rows.len(),
        "Applied recency filter"
    );

    NormalizedTable::new(rows)
}
