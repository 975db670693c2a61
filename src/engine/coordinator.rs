use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::ScanLatency;
use crate::db::StateStore;
use crate::engine::discovery::{candidate_ids, discover};
use crate::engine::instruments::tracked_instruments;
use crate::engine::spike::{ScanSummary, SpikeScanner};
use crate::engine::Clock;
use crate::error::Result;
use crate::feed::FeedSource;
use crate::notify::Notifier;
use crate::types::{MarketSnapshot, NewMarketEvent, SubscriberId};

/// Whether a scanner pass is in flight. Owned by the coordinator only; the
/// scanner task never sees it.
pub enum ScanState {
    Idle,
    Scanning(JoinHandle<ScanSummary>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanLaunch {
    Launched,
    /// A previous pass is still running; this tick's instruments are dropped.
    Skipped,
    /// Nobody to notify; the tick did nothing.
    NoDestination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub announced: usize,
    pub backfilled: usize,
    pub instruments: usize,
    pub scan: ScanLaunch,
}

/// Outer polling loop: snapshot → discovery → single-flight price scan.
pub struct ScanCoordinator {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn StateStore>,
    notifier: Arc<Notifier>,
    scanner: Arc<SpikeScanner>,
    state: ScanState,
    poll_interval: Duration,
    clock: Clock,
    health: Arc<HealthState>,
    latency: Arc<ScanLatency>,
}

impl ScanCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn StateStore>,
        notifier: Arc<Notifier>,
        scanner: Arc<SpikeScanner>,
        poll_interval: Duration,
        clock: Clock,
        health: Arc<HealthState>,
        latency: Arc<ScanLatency>,
    ) -> Self {
        Self {
            feed,
            store,
            notifier,
            scanner,
            state: ScanState::Idle,
            poll_interval,
            clock,
            health,
            latency,
        }
    }

    pub async fn run(mut self) {
        info!(interval_secs = self.poll_interval.as_secs(), "Starting market monitoring");
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let finished = tokio::select! {
                _ = ticker.tick() => None,
                joined = self.scan_completion() => Some(joined),
            };
            if let Some(joined) = finished {
                self.complete_scan(joined);
                continue;
            }

            let now = (self.clock)();
            match AssertUnwindSafe(self.tick(now)).catch_unwind().await {
                Ok(Ok(report)) => debug!(
                    announced = report.announced,
                    backfilled = report.backfilled,
                    instruments = report.instruments,
                    scan = ?report.scan,
                    "Tick complete",
                ),
                Ok(Err(e)) => error!("Monitor tick failed: {e}"),
                Err(_) => error!("Monitor tick panicked; continuing on next tick"),
            }
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, ScanState::Scanning(_))
    }

    /// One coordinator tick. Discovery always runs; a scan is launched only
    /// when no previous pass is still in flight.
    pub async fn tick(&mut self, now: i64) -> Result<TickReport> {
        self.health.record_tick(now);
        self.reap_finished_scan().await;

        let subscribers = self.store.list_subscribers().await?;
        if !self.notifier.has_destination(&subscribers) {
            debug!("No channel and no subscribers; skipping tick");
            return Ok(TickReport {
                announced: 0,
                backfilled: 0,
                instruments: 0,
                scan: ScanLaunch::NoDestination,
            });
        }

        let markets = self.feed.fetch_markets().await;
        let (announced, backfilled) = self.run_discovery(&markets, &subscribers, now).await;

        let instruments = tracked_instruments(&markets);
        let count = instruments.len();

        let scan = match self.state {
            ScanState::Scanning(_) => {
                self.health.record_scan_skipped();
                info!("Price monitoring still in progress, skipping spike update for this cycle");
                ScanLaunch::Skipped
            }
            ScanState::Idle => {
                let scanner = Arc::clone(&self.scanner);
                let handle = tokio::spawn(async move { scanner.run(instruments).await });
                self.state = ScanState::Scanning(handle);
                self.health.record_scan_launched();
                ScanLaunch::Launched
            }
        };

        Ok(TickReport { announced, backfilled, instruments: count, scan })
    }

    /// Announce and mark new markets. Failures are contained per market.
    async fn run_discovery(
        &self,
        markets: &[MarketSnapshot],
        subscribers: &[SubscriberId],
        now: i64,
    ) -> (usize, usize) {
        let processed = self.processed_ids(markets).await;
        let mut announced = 0;
        let mut backfilled = 0;

        for found in discover(markets, &processed, now) {
            let market = found.market;
            if found.announce {
                info!(market_id = %market.id, "New market detected: {}", market.title);
                let event = NewMarketEvent { market: market.clone(), is_multi: found.is_multi };
                self.notifier.announce_market(subscribers, &event).await;
                self.health.record_announcement();
                announced += 1;
            } else {
                debug!(market_id = %market.id, "Backfilling stale market without notification");
                backfilled += 1;
            }

            for (id, title) in found.markers() {
                if let Err(e) = self.store.mark_processed(id, title, now).await {
                    warn!(market_id = %id, "Failed to mark market processed: {e}");
                }
            }
        }

        (announced, backfilled)
    }

    /// Processed status for every discovery candidate. A market whose status
    /// cannot be read is treated as known for this tick.
    async fn processed_ids(&self, markets: &[MarketSnapshot]) -> HashSet<String> {
        let mut processed = HashSet::new();
        for id in candidate_ids(markets) {
            match self.store.is_processed(id).await {
                Ok(true) => {
                    processed.insert(id.to_string());
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(market_id = %id, "Cannot read processed state, skipping this tick: {e}");
                    processed.insert(id.to_string());
                }
            }
        }
        processed
    }

    /// Resolves when the in-flight pass ends; never resolves while `Idle`.
    /// Must be followed by [`Self::complete_scan`] before it is polled again.
    async fn scan_completion(&mut self) -> std::result::Result<ScanSummary, JoinError> {
        match &mut self.state {
            ScanState::Scanning(handle) => handle.await,
            ScanState::Idle => std::future::pending().await,
        }
    }

    /// Flip back to `Idle` after a pass ended, successfully or not.
    fn complete_scan(&mut self, joined: std::result::Result<ScanSummary, JoinError>) {
        self.state = ScanState::Idle;
        match joined {
            Ok(summary) => self.record_summary(&summary),
            Err(e) => error!("Price scan task failed: {e}"),
        }
        self.health.set_scan_in_flight(false);
    }

    /// Catch a pass that finished while the tick was not watching.
    async fn reap_finished_scan(&mut self) {
        let finished = matches!(&self.state, ScanState::Scanning(h) if h.is_finished());
        if finished {
            let joined = self.scan_completion().await;
            self.complete_scan(joined);
        }
    }

    fn record_summary(&self, summary: &ScanSummary) {
        self.latency.record(summary.elapsed);
        self.health.record_spikes(summary.spikes as u64);
        info!(
            instruments = summary.instruments,
            sampled = summary.sampled,
            spikes = summary.spikes,
            suppressed = summary.suppressed,
            no_price = summary.no_price,
            failures = summary.failures,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Price scan finished",
        );
    }
}

#[cfg(test)]
impl ScanCoordinator {
    /// Wait for the in-flight pass and return to `Idle`.
    pub async fn finish_scan(&mut self) -> Option<ScanSummary> {
        if !self.is_scanning() {
            return None;
        }
        let summary = self.scan_completion().await.expect("scan task");
        self.complete_scan(Ok(summary.clone()));
        Some(summary)
    }
}
