//! Upstream market-data access and trade persistence.
//!
//! This crate provides:
//! - The Kraken public REST client (pair catalog and trade pages)
//! - Strongly-typed decoding of the upstream wire format
//! - The TimescaleDB-backed trade repository
//! - The classified [`SyncError`] taxonomy shared by the engine

/// Error taxonomy.
pub mod error;
/// Upstream market-data providers.
pub mod providers;
/// Repository implementations for database persistence.
pub mod repositories;

pub use error::{PersistenceErrorKind, SyncError};
pub use repositories::{Database, SchemaStatus, TableStats, TradeRepository};
pub use sqlx::postgres::PgConnectOptions;

use async_trait::async_trait;
use trade_history_domain::{PairDescriptor, TableName, Trade, TradePage};

/// Resolves user-supplied symbols to canonical exchange pairs.
#[async_trait]
pub trait PairCatalog: Send + Sync {
    /// Resolves `symbol` against canonical ids first, then alternate names.
    async fn resolve(&self, symbol: &str) -> Result<PairDescriptor, SyncError>;
}

/// Fetches pages of public trade history.
#[async_trait]
pub trait TradeFetcher: Send + Sync {
    /// Maximum number of records requested per page.
    fn page_size(&self) -> usize;

    /// Fetches one page of trades starting at cursor `since`.
    async fn fetch_page(&self, pair: &PairDescriptor, since: i64) -> Result<TradePage, SyncError>;

    /// Id of the most recent trade upstream, if any trade exists.
    async fn latest_trade_id(&self, pair: &PairDescriptor) -> Result<Option<i64>, SyncError>;
}

/// Durable, append-only trade storage.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Creates the table and marks it time-partitioned if absent.
    async fn ensure_schema(&self, table: &TableName) -> Result<SchemaStatus, SyncError>;

    /// Highest committed trade id, `None` for an empty table.
    async fn max_trade_id(&self, table: &TableName) -> Result<Option<i64>, SyncError>;

    /// Cursor of the next record not yet persisted.
    async fn resume_cursor(&self, table: &TableName) -> Result<i64, SyncError> {
        Ok(self.max_trade_id(table).await?.map_or(0, |id| id + 1))
    }

    /// Persists one page atomically, returning the number of rows inserted.
    async fn write_batch(&self, table: &TableName, trades: &[Trade]) -> Result<u64, SyncError>;
}
