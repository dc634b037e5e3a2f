use serde::Serialize;

/// Result of writing one normalized row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// A new candle was stored
    Inserted { ts: i64 },
    /// A candle for this (ticker, ts) already existed; nothing changed
    Ignored { ts: i64 },
    /// The row could not be written and was left out of the batch
    Skipped { ts: i64, reason: String },
}

impl RowOutcome {
    pub fn ts(&self) -> i64 {
        match self {
            RowOutcome::Inserted { ts } | RowOutcome::Ignored { ts } | RowOutcome::Skipped { ts, .. } => *ts,
        }
    }
}

/// Batch report of one upsert call
///
/// `attempted` is the number of rows handed to the store, whatever happened
/// to them. `inserted + ignored + skipped == attempted`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpsertReport {
    pub attempted: usize,
    pub inserted: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub outcomes: Vec<RowOutcome>,
}

impl UpsertReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        self.attempted += 1;
        match outcome {
            RowOutcome::Inserted { .. } => self.inserted += 1,
            RowOutcome::Ignored { .. } => self.ignored += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Skipped rows with their reasons
    pub fn skipped_rows(&self) -> impl Iterator<Item = (i64, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            RowOutcome::Skipped { ts, reason } => Some((*ts, reason.as_str())),
            _ => None,
        })
    }
}

/// Outcome of ingesting one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub ticker: String,
    /// Rows returned by the source
    pub fetched: usize,
    /// Rows left after the recency filter
    pub recent: usize,
    pub upsert: UpsertReport,
}

impl IngestReport {
    /// Rows handed to the store (the value reported to the scheduler)
    pub fn attempted(&self) -> usize {
        self.upsert.attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = UpsertReport::new();
        report.record(RowOutcome::Inserted { ts: 1 });
        report.record(RowOutcome::Ignored { ts: 2 });
        report.record(RowOutcome::Skipped {
            ts: 3,
            reason: "close: non-numeric value 'x'".to_string(),
        });

        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.skipped, 1);

        let skipped: Vec<_> = report.skipped_rows().collect();
        assert_eq!(skipped, vec![(3, "close: non-numeric value 'x'")]);
        assert_eq!(report.outcomes[1].ts(), 2);
    }
}
