//! Trade repository backed by a TimescaleDB hypertable per pair.

use crate::TradeStore;
use crate::error::SyncError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, info};
use trade_history_domain::{TableName, Trade};

/// Hypertable chunk width: one day in nanoseconds.
pub const CHUNK_TIME_INTERVAL_NS: i64 = 86_400_000_000_000;

/// Outcome of [`TradeStore::ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The table did not exist and was created as a hypertable.
    Created,
    /// The table was already present.
    Existing,
}

/// Summary of a trade table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Number of committed rows.
    pub row_count: i64,
    /// Highest committed trade id.
    pub max_trade_id: Option<i64>,
    /// Most recent trade time in nanoseconds since the epoch.
    pub latest_time_ns: Option<i64>,
}

fn create_table_sql(table: &TableName) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            time BIGINT NOT NULL,
            price DOUBLE PRECISION,
            volume DOUBLE PRECISION,
            side TEXT,
            type TEXT,
            misc TEXT,
            trade_id BIGINT NOT NULL
        )
        "#,
        table.quoted()
    )
}

fn unique_index_sql(table: &TableName) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS \"{}_trade_id_idx\" ON {} (trade_id, time)",
        table.as_str(),
        table.quoted()
    )
}

fn insert_prefix(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (time, price, volume, side, type, misc, trade_id) ",
        table.quoted()
    )
}

/// Repository for per-pair trade tables.
#[derive(Clone)]
pub struct TradeRepository {
    pool: Arc<PgPool>,
}

impl TradeRepository {
    /// Creates a new TradeRepository.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Checks whether `table` exists in the current schema.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn table_exists(&self, table: &TableName) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(table.as_str())
        .fetch_one(self.pool.as_ref())
        .await
    }

    /// Creates `table` and converts it into a hypertable partitioned on `time`.
    ///
    /// Runs in a single transaction so a failure leaves no half-made table.
    ///
    /// # Errors
    /// Returns an error if any statement fails, including a missing
    /// TimescaleDB extension.
    pub async fn create_hypertable(&self, table: &TableName) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&create_table_sql(table))
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE EXTENSION IF NOT EXISTS timescaledb")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "SELECT create_hypertable($1::regclass, 'time', chunk_time_interval => $2, if_not_exists => TRUE)",
        )
        .bind(table.quoted())
        .bind(CHUNK_TIME_INTERVAL_NS)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// Ensures the unique index backing conflict-free re-inserts.
    ///
    /// # Errors
    /// Returns an error if the index cannot be created, e.g. because the
    /// table already holds duplicate trade ids.
    pub async fn ensure_unique_index(&self, table: &TableName) -> Result<(), sqlx::Error> {
        sqlx::query(&unique_index_sql(table))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    /// Finds the highest committed trade id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_max_trade_id(&self, table: &TableName) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(&format!("SELECT MAX(trade_id) FROM {}", table.quoted()))
            .fetch_one(self.pool.as_ref())
            .await
    }

    /// Inserts `trades` in one transaction, skipping ids already present.
    ///
    /// # Errors
    /// Returns an error if the insert or commit fails; nothing is applied then.
    pub async fn insert_batch(&self, table: &TableName, trades: &[Trade]) -> Result<u64, sqlx::Error> {
        if trades.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix(table));
        builder.push_values(trades, |mut row, trade| {
            row.push_bind(trade.time_ns)
                .push_bind(trade.price)
                .push_bind(trade.volume)
                .push_bind(trade.side.as_code())
                .push_bind(trade.order_type.as_code())
                .push_bind(trade.misc.clone())
                .push_bind(trade.trade_id);
        });
        builder.push(" ON CONFLICT (trade_id, time) DO NOTHING");

        let mut tx = self.pool.begin().await?;
        let result = builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    /// Computes row count, highest trade id and latest trade time.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn stats(&self, table: &TableName) -> Result<TableStats, sqlx::Error> {
        let (row_count, max_trade_id, latest_time_ns): (i64, Option<i64>, Option<i64>) =
            sqlx::query_as(&format!(
                "SELECT COUNT(*), MAX(trade_id), MAX(time) FROM {}",
                table.quoted()
            ))
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(TableStats {
            row_count,
            max_trade_id,
            latest_time_ns,
        })
    }
}

#[async_trait]
impl TradeStore for TradeRepository {
    async fn ensure_schema(&self, table: &TableName) -> Result<SchemaStatus, SyncError> {
        let status = if self.table_exists(table).await? {
            debug!(table = %table, "Table already exists");
            SchemaStatus::Existing
        } else {
            info!(table = %table, "Table does not exist, creating hypertable");
            self.create_hypertable(table).await?;
            SchemaStatus::Created
        };
        self.ensure_unique_index(table).await?;
        Ok(status)
    }

    async fn max_trade_id(&self, table: &TableName) -> Result<Option<i64>, SyncError> {
        Ok(self.find_max_trade_id(table).await?)
    }

    async fn write_batch(&self, table: &TableName, trades: &[Trade]) -> Result<u64, SyncError> {
        let inserted = self.insert_batch(table, trades).await?;
        debug!(
            table = %table,
            records = trades.len(),
            inserted = inserted,
            "Batch inserted"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::new("xxbtzusd_kraken_trades").unwrap()
    }

    #[test]
    fn test_create_table_sql_columns() {
        let sql = create_table_sql(&table());
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"xxbtzusd_kraken_trades\""));
        for column in [
            "time BIGINT NOT NULL",
            "price DOUBLE PRECISION",
            "volume DOUBLE PRECISION",
            "side TEXT",
            "type TEXT",
            "misc TEXT",
            "trade_id BIGINT NOT NULL",
        ] {
            assert!(sql.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn test_unique_index_covers_partition_column() {
        assert_eq!(
            unique_index_sql(&table()),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"xxbtzusd_kraken_trades_trade_id_idx\" \
             ON \"xxbtzusd_kraken_trades\" (trade_id, time)"
        );
    }

    #[test]
    fn test_insert_prefix_column_order() {
        assert_eq!(
            insert_prefix(&table()),
            "INSERT INTO \"xxbtzusd_kraken_trades\" (time, price, volume, side, type, misc, trade_id) "
        );
    }

    #[test]
    fn test_statements_quote_leading_digit_tables() {
        let table = TableName::new("1inchusd_kraken_trades").unwrap();
        assert!(create_table_sql(&table).contains("CREATE TABLE IF NOT EXISTS \"1inchusd_kraken_trades\" ("));
        assert!(unique_index_sql(&table).ends_with("ON \"1inchusd_kraken_trades\" (trade_id, time)"));
        assert!(insert_prefix(&table).starts_with("INSERT INTO \"1inchusd_kraken_trades\" ("));
    }

    #[test]
    fn test_chunk_interval_is_one_day() {
        assert_eq!(CHUNK_TIME_INTERVAL_NS, 24 * 60 * 60 * 1_000_000_000);
    }
}
