//! Explicit run configuration.
//!
//! Values are resolved once by the caller and handed to constructors; no
//! component reads environment state on its own.

use crate::retry::RetryPolicy;
use std::time::Duration;
use trade_history_data::{PgConnectOptions, SyncError};
use trade_history_domain::RateLimitTier;

/// Configuration for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pair symbol as entered by the user; canonical id or alternate name.
    pub pair: String,
    /// Account tier used to derive call pacing.
    pub tier: RateLimitTier,
    /// Explicit pacing interval taking precedence over the tier's.
    pub pacing_override: Option<Duration>,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Creates a configuration with default tier and retry policy.
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            tier: RateLimitTier::default(),
            pacing_override: None,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_tier(mut self, tier: RateLimitTier) -> Self {
        self.tier = tier;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing_override = Some(interval);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Interval enforced between consecutive upstream calls.
    #[must_use]
    pub fn pacing_interval(&self) -> Duration {
        self.pacing_override
            .unwrap_or_else(|| self.tier.pacing_interval())
    }

    /// Checks the configuration before a run.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.pair.trim().is_empty() {
            return Err(SyncError::Config("pair symbol is empty".to_string()));
        }
        self.retry.validate()
    }
}

/// PostgreSQL connection settings.
///
/// Either a complete `url`, or the individual parts. The database name
/// defaults to the lower-cased pair symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            host: "localhost".to_string(),
            port: 5432,
            database: None,
        }
    }
}

impl DatabaseSettings {
    /// Builds connect options for `pair_symbol`'s database.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] if the URL does not parse, no database
    /// name can be derived, or a password is given without a user.
    pub fn connect_options(&self, pair_symbol: &str) -> Result<PgConnectOptions, SyncError> {
        if let Some(url) = &self.url {
            return url
                .parse::<PgConnectOptions>()
                .map_err(|e| SyncError::Config(format!("invalid database url: {e}")));
        }

        let database = match &self.database {
            Some(name) => name.clone(),
            None => pair_symbol.trim().to_ascii_lowercase(),
        };
        if database.is_empty() {
            return Err(SyncError::Config("database name is empty".to_string()));
        }

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .database(&database);
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                options = options.username(user).password(password);
            }
            (Some(user), None) => options = options.username(user),
            (None, Some(_)) => {
                return Err(SyncError::Config(
                    "database password given without a user".to_string(),
                ));
            }
            (None, None) => {}
        }
        Ok(options)
    }
}
