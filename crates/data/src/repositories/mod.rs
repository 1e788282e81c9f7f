//! Repository implementations for database persistence.
//!
//! Trades for each pair live in their own TimescaleDB hypertable; the
//! highest committed trade id doubles as the resumption cursor.

mod trade_repository;

pub use trade_repository::{CHUNK_TIME_INTERVAL_NS, SchemaStatus, TableStats, TradeRepository};

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::sync::Arc;

/// Sync runs one write at a time; a second connection covers status queries.
const MAX_CONNECTIONS: u32 = 2;

/// Database connection wrapper for repositories.
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Creates a new Database wrapper from a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Creates a new database connection from a connection string.
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates a new database connection from prepared connect options.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect_with(options: PgConnectOptions) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates a TradeRepository instance.
    #[must_use]
    pub fn trades(&self) -> TradeRepository {
        TradeRepository::new(self.pool.clone())
    }
}
