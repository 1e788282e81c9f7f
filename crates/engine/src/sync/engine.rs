//! Resume → fetch → persist → advance orchestration.

use super::report::{BacklogEstimate, SyncPlan, SyncReport, SyncState};
use crate::config::SyncConfig;
use crate::rate_limit::RateLimiter;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};
use trade_history_data::{PairCatalog, SyncError, TradeFetcher, TradeStore};
use trade_history_domain::{TableName, Trade};
use uuid::Uuid;

/// Drives one pair from its last committed trade up to the upstream head.
///
/// Execution is strictly sequential: a page is committed before the next
/// one is requested, so the store's highest trade id is always a valid
/// resume point.
pub struct SyncEngine<C, F, S> {
    /// Run configuration.
    config: SyncConfig,
    /// Pair catalog.
    catalog: C,
    /// Trade page source.
    fetcher: F,
    /// Trade storage.
    store: S,
    /// Pacing for upstream calls.
    limiter: RateLimiter,
    /// Current phase.
    state: RwLock<SyncState>,
    /// Correlation id attached to every log line of the run.
    run_id: Uuid,
}

impl<C, F, S> SyncEngine<C, F, S>
where
    C: PairCatalog,
    F: TradeFetcher,
    S: TradeStore,
{
    /// Creates an engine; pacing is derived from the configuration.
    pub fn new(config: SyncConfig, catalog: C, fetcher: F, store: S) -> Self {
        let limiter = RateLimiter::new(config.pacing_interval());
        Self {
            config,
            catalog,
            fetcher,
            store,
            limiter,
            state: RwLock::new(SyncState::Idle),
            run_id: Uuid::new_v4(),
        }
    }

    /// Gets the current state.
    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    /// Correlation id of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Gets the active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Resolves the pair, ensures storage and syncs until caught up.
    ///
    /// # Errors
    /// Returns the first permanent error, or a transient one once retries
    /// are exhausted.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let plan = self.prepare().await?;
        self.sync(&plan).await
    }

    /// Runs the resolving and bootstrapping phases.
    ///
    /// # Errors
    /// Returns [`SyncError::PairNotFound`] for an unknown symbol, or any
    /// storage error raised while bootstrapping.
    pub async fn prepare(&self) -> Result<SyncPlan, SyncError> {
        let span = info_span!("prepare", run_id = %self.run_id, symbol = %self.config.pair);
        let result = self.resolve_and_bootstrap().instrument(span).await;
        self.settle(result).await
    }

    /// Runs the syncing phase from `plan` until a short page arrives.
    ///
    /// # Errors
    /// Returns the first unrecoverable fetch, decode or persistence error.
    /// Pages committed before the error stay committed.
    pub async fn sync(&self, plan: &SyncPlan) -> Result<SyncReport, SyncError> {
        let span = info_span!("sync", run_id = %self.run_id, pair = %plan.pair.id);
        let result = self.sync_pages(plan).instrument(span).await;
        let result = self.settle(result).await;
        if result.is_ok() {
            self.transition_to(SyncState::CaughtUp).await;
        }
        result
    }

    /// Estimates the backlog between `plan` and the upstream head.
    ///
    /// # Errors
    /// Returns an error if the latest trade cannot be fetched.
    pub async fn estimate(&self, plan: &SyncPlan) -> Result<BacklogEstimate, SyncError> {
        let limiter = &self.limiter;
        let fetcher = &self.fetcher;
        let pair = &plan.pair;

        let latest = self
            .config
            .retry
            .run("latest_trade", || async move {
                limiter.wait().await;
                fetcher.latest_trade_id(pair).await
            })
            .await?;

        let estimate = BacklogEstimate::compute(
            latest,
            plan.high_water,
            self.fetcher.page_size(),
            self.limiter.interval(),
        );
        info!(
            run_id = %self.run_id,
            pair = %plan.pair.id,
            latest_trade_id = ?latest,
            trades_remaining = estimate.trades_remaining,
            pages_remaining = estimate.pages_remaining,
            eta_secs = estimate.eta.as_secs(),
            "Estimated backlog"
        );
        Ok(estimate)
    }

    async fn resolve_and_bootstrap(&self) -> Result<SyncPlan, SyncError> {
        self.config.validate()?;
        let retry = &self.config.retry;

        self.transition_to(SyncState::Resolving).await;
        let catalog = &self.catalog;
        let symbol = self.config.pair.as_str();
        let pair = retry
            .run("resolve_pair", || catalog.resolve(symbol))
            .await?;

        self.transition_to(SyncState::Bootstrapping).await;
        let table = TableName::for_pair(&pair)?;
        let store = &self.store;
        let schema = retry
            .run("ensure_schema", || store.ensure_schema(&table))
            .await?;
        let high_water = retry
            .run("max_trade_id", || store.max_trade_id(&table))
            .await?;

        let plan = SyncPlan::new(pair, table, schema, high_water);
        info!(
            pair = %plan.pair.id,
            table = %plan.table,
            schema = ?plan.schema,
            cursor = plan.cursor,
            "Resuming sync"
        );
        Ok(plan)
    }

    async fn sync_pages(&self, plan: &SyncPlan) -> Result<SyncReport, SyncError> {
        self.transition_to(SyncState::Syncing).await;

        let started = Instant::now();
        let mut report = SyncReport::start(self.run_id, plan);
        let mut cursor = plan.cursor;
        let mut high_water = plan.high_water;

        let retry = &self.config.retry;
        let limiter = &self.limiter;
        let fetcher = &self.fetcher;
        let store = &self.store;
        let pair = &plan.pair;
        let table = &plan.table;

        loop {
            report.final_cursor = cursor;
            let page = retry
                .run("fetch_page", || async move {
                    limiter.wait().await;
                    fetcher.fetch_page(pair, cursor).await
                })
                .await?;
            report.pages += 1;
            report.records_fetched += page.trades.len() as u64;

            if !page.is_strictly_ascending() {
                return Err(SyncError::MalformedRecord(format!(
                    "trade ids on page at cursor {cursor} are not strictly ascending"
                )));
            }

            // Parsed now, applied after the write: a bad marker still
            // leaves this page committed.
            let next_cursor = (!page.is_final).then(|| page.next_cursor()).transpose();
            let is_final = page.is_final;

            let received = page.trades.len() as u64;
            let fresh: Vec<Trade> = page
                .trades
                .into_iter()
                .filter(|t| high_water.is_none_or(|hw| t.trade_id > hw))
                .collect();
            let skipped = received - fresh.len() as u64;
            if skipped > 0 {
                warn!(
                    cursor = cursor,
                    skipped = skipped,
                    high_water = ?high_water,
                    "Dropped records at or below the committed high-water mark"
                );
            }

            let inserted = if fresh.is_empty() {
                0
            } else {
                let batch = fresh.as_slice();
                retry
                    .run("write_batch", || store.write_batch(table, batch))
                    .await?
            };
            report.records_skipped += skipped;
            report.rows_written += inserted;
            if let Some(last) = fresh.last() {
                high_water = Some(last.trade_id);
                report.high_water = high_water;
            }

            info!(
                page = report.pages,
                cursor = cursor,
                records = received,
                inserted = inserted,
                total_rows = report.rows_written,
                "Persisted page"
            );

            if is_final {
                report.elapsed = started.elapsed();
                info!(
                    pages = report.pages,
                    rows = report.rows_written,
                    high_water = ?report.high_water,
                    elapsed_secs = report.elapsed.as_secs(),
                    "Trades database is up to date"
                );
                return Ok(report);
            }

            cursor = next_cursor?.unwrap_or(cursor);
        }
    }

    /// Logs and records a failed phase; passes the result through.
    async fn settle<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(err) = &result {
            error!(
                run_id = %self.run_id,
                error = %err,
                transient = err.is_transient(),
                "Sync aborted"
            );
            self.transition_to(SyncState::Failed).await;
        }
        result
    }

    /// Transitions to a new state.
    async fn transition_to(&self, new_state: SyncState) {
        let mut state = self.state.write().await;
        let old_state = *state;

        if old_state != new_state {
            *state = new_state;
            info!(
                old_state = %old_state,
                new_state = %new_state,
                "Sync state changed"
            );
        }
    }
}
