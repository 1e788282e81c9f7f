//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use trade_history_engine::prelude::*;
//! ```

// Config
pub use crate::config::{DatabaseSettings, SyncConfig};

// Rate limiting
pub use crate::rate_limit::RateLimiter;

// Retry
pub use crate::retry::RetryPolicy;

// Sync
pub use crate::sync::{BacklogEstimate, SyncEngine, SyncPlan, SyncReport, SyncState};

// Components and errors
pub use trade_history_data::{
    PairCatalog, PersistenceErrorKind, SchemaStatus, SyncError, TradeFetcher, TradeStore,
};
