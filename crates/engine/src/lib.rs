//! Incremental trade-history synchronization.
//!
//! This crate drives the resume → fetch → persist → advance loop:
//! - Rate-limit pacing per Kraken account tier
//! - Capped exponential backoff for transient failures
//! - The sync state machine and its run report
//! - Backlog estimation before a long sync

/// Prelude module for convenient imports.
pub mod prelude;

/// Sync configuration.
pub mod config;
/// Call pacing.
pub mod rate_limit;
/// Retry policy for transient failures.
pub mod retry;
/// Sync state machine.
pub mod sync;
