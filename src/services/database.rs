use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::error::ErrorKind;
use sqlx::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{CANDLES_TABLE, DB_BUSY_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::models::{normalize_ticker, Candle, NormalizedTable, RowOutcome, TickerCounts, UpsertReport};

const SQL_CREATE: &str = r#"
    CREATE TABLE IF NOT EXISTS candles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticker TEXT NOT NULL,
        ts INTEGER NOT NULL,
        open REAL, high REAL, low REAL, close REAL,
        volume REAL,
        UNIQUE(ticker, ts)
    )
"#;

const SQL_INSERT: &str = r#"
    INSERT OR IGNORE INTO candles (ticker, ts, open, high, low, close, volume)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

// Legacy rows may hold NULL prices; read them back as the zero sentinel
const SQL_RECENT: &str = r#"
    SELECT ticker, ts,
           COALESCE(open, 0.0) AS open,
           COALESCE(high, 0.0) AS high,
           COALESCE(low, 0.0) AS low,
           COALESCE(close, 0.0) AS close,
           COALESCE(volume, 0.0) AS volume
    FROM candles
    WHERE ticker = ?1
    ORDER BY ts DESC
    LIMIT ?2
"#;

/// SQLite store for minute candles
///
/// Holds only connection settings. Every operation opens its own connection
/// and closes it before returning, so concurrent ingestions never share one;
/// `UNIQUE(ticker, ts)` plus `INSERT OR IGNORE` keeps writes idempotent.
#[derive(Debug, Clone)]
pub struct CandleStore {
    connect_options: SqliteConnectOptions,
    database_path: PathBuf,
}

impl CandleStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let database_path = database_path.into();

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal) // concurrent readers while a ticker writes
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(DB_BUSY_TIMEOUT_SECS));

        Self {
            connect_options,
            database_path,
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = SqliteConnection::connect_with(&self.connect_options).await?;
        Ok(conn)
    }

    /// Create the candles table if missing; safe to call on every run
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        sqlx::query(SQL_CREATE).execute(&mut conn).await?;
        conn.close().await?;

        debug!(path = %self.database_path.display(), "Candle schema ready");
        Ok(())
    }

    /// Insert every row of `table` once per (ticker, ts)
    ///
    /// Creates the table first when it is missing. Existing pairs are left
    /// untouched. Rows whose cells are not numeric, or whose insert violates
    /// a constraint, are recorded as skipped and the batch carries on. Any
    /// other database failure aborts the batch and is returned as an error.
    /// `report.attempted` always equals `table.len()`.
    pub async fn upsert(&self, ticker: &str, table: &NormalizedTable) -> Result<UpsertReport> {
        let ticker = normalize_ticker(ticker);
        let mut report = UpsertReport::new();

        if table.is_empty() {
            debug!(ticker = %ticker, "No rows to insert");
            return Ok(report);
        }

        let mut conn = self.connect().await?;
        // Outside the transaction so concurrent writers never upgrade a read lock
        sqlx::query(SQL_CREATE).execute(&mut conn).await?;
        let mut transaction = conn.begin().await?;

        for row in table.rows() {
            let ts = row.epoch_seconds();

            let candle = match row.to_candle(&ticker) {
                Ok(candle) => candle,
                Err(reason) => {
                    warn!(ticker = %ticker, ts, reason = %reason, "Skipping malformed row");
                    report.record(RowOutcome::Skipped { ts, reason });
                    continue;
                }
            };

            let result = sqlx::query(SQL_INSERT)
                .bind(&candle.ticker)
                .bind(candle.ts)
                .bind(candle.open)
                .bind(candle.high)
                .bind(candle.low)
                .bind(candle.close)
                .bind(candle.volume)
                .execute(&mut *transaction)
                .await;

            match result {
                Ok(done) if done.rows_affected() > 0 => report.record(RowOutcome::Inserted { ts }),
                Ok(_) => report.record(RowOutcome::Ignored { ts }),
                Err(e) if is_row_error(&e) => {
                    warn!(ticker = %ticker, ts, error = %e, "Failed to insert row");
                    report.record(RowOutcome::Skipped {
                        ts,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "insert into {} failed for {} at ts={}: {}",
                        CANDLES_TABLE, ticker, ts, e
                    )));
                }
            }
        }

        transaction.commit().await?;
        conn.close().await?;

        debug!(
            ticker = %ticker,
            attempted = report.attempted,
            inserted = report.inserted,
            ignored = report.ignored,
            skipped = report.skipped,
            "Upsert finished"
        );
        Ok(report)
    }

    /// Stored candle count per ticker
    pub async fn counts_by_ticker(&self) -> Result<TickerCounts> {
        let mut conn = self.connect().await?;
        if !table_exists(&mut conn).await? {
            conn.close().await?;
            return Ok(TickerCounts::new());
        }

        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT ticker, COUNT(*) FROM candles GROUP BY ticker")
            .fetch_all(&mut conn)
            .await?;
        conn.close().await?;

        Ok(rows.into_iter().collect())
    }

    /// Distinct tickers with at least one stored candle
    pub async fn tickers(&self) -> Result<Vec<String>> {
        let mut conn = self.connect().await?;
        if !table_exists(&mut conn).await? {
            conn.close().await?;
            return Ok(Vec::new());
        }

        let tickers: Vec<String> = sqlx::query_scalar("SELECT DISTINCT ticker FROM candles ORDER BY ticker")
            .fetch_all(&mut conn)
            .await?;
        conn.close().await?;
        Ok(tickers)
    }

    /// Newest `limit` candles for a ticker, ordered by `ts` descending
    pub async fn recent_candles(&self, ticker: &str, limit: u32) -> Result<Vec<Candle>> {
        let mut conn = self.connect().await?;
        if !table_exists(&mut conn).await? {
            conn.close().await?;
            return Ok(Vec::new());
        }

        let candles: Vec<Candle> = sqlx::query_as(SQL_RECENT)
            .bind(normalize_ticker(ticker))
            .bind(i64::from(limit))
            .fetch_all(&mut conn)
            .await?;
        conn.close().await?;
        Ok(candles)
    }
}

/// Errors confined to the offending row; everything else means the store is unusable
fn is_row_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => !matches!(db_err.kind(), ErrorKind::Other),
        sqlx::Error::Encode(_) => true,
        _ => false,
    }
}

async fn table_exists(conn: &mut SqliteConnection) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .bind(CANDLES_TABLE)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, NormalizedRow};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use tempfile::tempdir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn table(n: i64, base_price: f64) -> NormalizedTable {
        NormalizedTable::new(
            (0..n)
                .map(|i| {
                    let p = base_price + i as f64;
                    NormalizedRow::from_values(t0() + ChronoDuration::minutes(i), [p, p + 1.0, p - 1.0, p, 100.0])
                })
                .collect(),
        )
    }

    async fn total_rows(store: &CandleStore) -> i64 {
        store.counts_by_ticker().await.unwrap().values().sum()
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("nested").join("market.db"));

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
        assert!(store.database_path().exists());
    }

    #[tokio::test]
    async fn test_schema_layout() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let mut conn = store.connect().await.unwrap();
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('candles') ORDER BY cid")
            .fetch_all(&mut conn)
            .await
            .unwrap();
        assert_eq!(columns, vec!["id", "ticker", "ts", "open", "high", "low", "close", "volume"]);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let rows = table(3, 100.0);

        let first = store.upsert("AAPL", &rows).await.unwrap();
        assert_eq!(first.attempted, 3);
        assert_eq!(first.inserted, 3);
        assert_eq!(total_rows(&store).await, 3);

        let second = store.upsert("AAPL", &rows).await.unwrap();
        assert_eq!(second.attempted, 3);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.ignored, 3);
        assert_eq!(total_rows(&store).await, 3);
    }

    #[tokio::test]
    async fn test_first_insert_wins() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        store.upsert("AAPL", &table(1, 100.0)).await.unwrap();
        let report = store.upsert("AAPL", &table(1, 500.0)).await.unwrap();
        assert_eq!(report.ignored, 1);

        let stored = store.recent_candles("AAPL", 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].open, 100.0);
    }

    #[tokio::test]
    async fn test_same_timestamp_different_tickers() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        store.upsert("AAPL", &table(2, 100.0)).await.unwrap();
        store.upsert("msft", &table(2, 200.0)).await.unwrap();

        let counts = store.counts_by_ticker().await.unwrap();
        assert_eq!(counts.get("AAPL"), Some(&2));
        assert_eq!(counts.get("MSFT"), Some(&2));
        assert_eq!(store.tickers().await.unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_malformed_row_does_not_abort_batch() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let mut rows = table(3, 100.0).into_rows();
        rows[1].close = Cell::Text("bad".to_string());
        let bad_ts = rows[1].epoch_seconds();

        let report = store.upsert("AAPL", &NormalizedTable::new(rows)).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);

        let skipped: Vec<_> = report.skipped_rows().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, bad_ts);
        assert!(skipped[0].1.contains("close"));
        assert_eq!(total_rows(&store).await, 2);
    }

    #[tokio::test]
    async fn test_missing_cells_stored_as_zero() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let row = NormalizedRow::new(t0(), Cell::Number(1.0), Cell::Missing, Cell::Number(f64::NAN), Cell::Number(2.0), Cell::Missing);
        store.upsert("AAPL", &NormalizedTable::new(vec![row])).await.unwrap();

        let stored = store.recent_candles("AAPL", 1).await.unwrap();
        assert_eq!(stored[0], Candle::new("AAPL", t0().timestamp(), 1.0, 0.0, 0.0, 2.0, 0.0));
    }

    #[tokio::test]
    async fn test_empty_table_returns_zero() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let report = store.upsert("MSFT", &NormalizedTable::empty()).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_recent_candles_order_and_limit() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();
        store.upsert("AAPL", &table(5, 100.0)).await.unwrap();

        let candles = store.recent_candles("aapl", 3).await.unwrap();
        let ts: Vec<i64> = candles.iter().map(|c| c.ts).collect();
        let base = t0().timestamp();
        assert_eq!(ts, vec![base + 240, base + 180, base + 120]);

        assert!(store.recent_candles("TSLA", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_before_schema_exist() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("fresh.db"));

        assert!(store.counts_by_ticker().await.unwrap().is_empty());
        assert!(store.tickers().await.unwrap().is_empty());
        assert!(store.recent_candles("AAPL", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_into_fresh_database() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("fresh.db"));

        let report = store.upsert("AAPL", &table(2, 100.0)).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(total_rows(&store).await, 2);
    }

    #[test]
    fn test_store_errors_are_not_row_errors() {
        assert!(!is_row_error(&sqlx::Error::RowNotFound));
        assert!(!is_row_error(&sqlx::Error::PoolTimedOut));
        assert!(!is_row_error(&sqlx::Error::Io(std::io::Error::other("disk I/O error"))));
    }

    #[tokio::test]
    async fn test_unwritable_table_fails_batch() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        // A view named candles makes every insert fail
        let mut conn = store.connect().await.unwrap();
        sqlx::query("DROP TABLE candles").execute(&mut conn).await.unwrap();
        sqlx::query("CREATE VIEW candles AS SELECT 1 AS ticker").execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();

        let result = store.upsert("AAPL", &table(2, 100.0)).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates() {
        let temp_dir = tempdir().unwrap();
        // A directory cannot be opened as a database file
        let store = CandleStore::new(temp_dir.path());

        let result = store.upsert("AAPL", &table(1, 100.0)).await;
        assert!(matches!(result, Err(AppError::Database(_)) | Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let temp_dir = tempdir().unwrap();
        let store = CandleStore::new(temp_dir.path().join("market.db"));
        store.ensure_schema().await.unwrap();

        let mut handles = Vec::new();
        for ticker in ["AAPL", "AAPL", "MSFT", "MSFT"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.upsert(ticker, &table(30, 10.0)).await }));
        }
        for handle in handles {
            let report = handle.await.unwrap().unwrap();
            assert_eq!(report.attempted, 30);
        }

        let counts = store.counts_by_ticker().await.unwrap();
        assert_eq!(counts.get("AAPL"), Some(&30));
        assert_eq!(counts.get("MSFT"), Some(&30));
    }
}
