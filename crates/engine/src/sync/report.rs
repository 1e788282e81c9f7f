//! Plans, estimates and reports produced by the sync engine.

use std::fmt;
use std::time::Duration;
use trade_history_data::SchemaStatus;
use trade_history_domain::{PairDescriptor, TableName};
use uuid::Uuid;

/// Phase of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing has happened yet.
    Idle,
    /// Resolving the requested symbol against the catalog.
    Resolving,
    /// Ensuring the table and deriving the resume cursor.
    Bootstrapping,
    /// Fetching and persisting pages.
    Syncing,
    /// The last page was short; history is up to date.
    CaughtUp,
    /// The run aborted on an error.
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Resolving => "resolving",
            SyncState::Bootstrapping => "bootstrapping",
            SyncState::Syncing => "syncing",
            SyncState::CaughtUp => "caught up",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where a run starts, established during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Resolved pair.
    pub pair: PairDescriptor,
    /// Target table.
    pub table: TableName,
    /// Whether bootstrap created the table.
    pub schema: SchemaStatus,
    /// Highest committed trade id at bootstrap.
    pub high_water: Option<i64>,
    /// First cursor to request.
    pub cursor: i64,
}

impl SyncPlan {
    /// Builds a plan, deriving the cursor from the committed high-water mark.
    pub fn new(
        pair: PairDescriptor,
        table: TableName,
        schema: SchemaStatus,
        high_water: Option<i64>,
    ) -> Self {
        Self {
            pair,
            table,
            schema,
            high_water,
            cursor: high_water.map_or(0, |id| id + 1),
        }
    }
}

/// Rough size of the remaining backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklogEstimate {
    /// Most recent trade id upstream.
    pub latest_trade_id: Option<i64>,
    /// Trades between the high-water mark and the latest trade.
    pub trades_remaining: u64,
    /// Pages needed to fetch them.
    pub pages_remaining: u64,
    /// Time needed at the configured pacing.
    pub eta: Duration,
}

impl BacklogEstimate {
    /// Computes the estimate from the upstream head and local high-water mark.
    #[must_use]
    pub fn compute(
        latest_trade_id: Option<i64>,
        high_water: Option<i64>,
        page_size: usize,
        pacing: Duration,
    ) -> Self {
        let trades_remaining = latest_trade_id
            .map(|latest| latest.saturating_sub(high_water.unwrap_or(0)).max(0) as u64)
            .unwrap_or(0);
        let pages_remaining = trades_remaining.div_ceil(page_size.max(1) as u64);
        let eta = Duration::from_secs_f64(pacing.as_secs_f64() * pages_remaining as f64);
        Self {
            latest_trade_id,
            trades_remaining,
            pages_remaining,
            eta,
        }
    }

    /// ETA split into whole days, hours and minutes.
    #[must_use]
    pub fn eta_breakdown(&self) -> (u64, u64, u64) {
        let secs = self.eta.as_secs();
        (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60)
    }
}

impl fmt::Display for BacklogEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (days, hours, minutes) = self.eta_breakdown();
        write!(
            f,
            "{} trades in {} pages, about {days} days {hours} hours {minutes} minutes",
            self.trades_remaining, self.pages_remaining
        )
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Correlation id of the run.
    pub run_id: Uuid,
    /// Canonical pair id.
    pub pair: String,
    /// Target table.
    pub table: TableName,
    /// Whether bootstrap created the table.
    pub schema: SchemaStatus,
    /// Cursor of the first request.
    pub starting_cursor: i64,
    /// Cursor of the last request.
    pub final_cursor: i64,
    /// Pages fetched.
    pub pages: u64,
    /// Records received from upstream.
    pub records_fetched: u64,
    /// Rows committed.
    pub rows_written: u64,
    /// Records dropped as already committed.
    pub records_skipped: u64,
    /// Highest committed trade id at the end of the run.
    pub high_water: Option<i64>,
    /// Wall-clock duration of the syncing phase.
    pub elapsed: Duration,
}

impl SyncReport {
    pub(crate) fn start(run_id: Uuid, plan: &SyncPlan) -> Self {
        Self {
            run_id,
            pair: plan.pair.id.clone(),
            table: plan.table.clone(),
            schema: plan.schema,
            starting_cursor: plan.cursor,
            final_cursor: plan.cursor,
            pages: 0,
            records_fetched: 0,
            rows_written: 0,
            records_skipped: 0,
            high_water: plan.high_water,
            elapsed: Duration::ZERO,
        }
    }
}
