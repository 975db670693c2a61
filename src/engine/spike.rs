use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::{NOTIFY_COOLDOWN_SECS, PRICE_LOOKBACK_SECS};
use crate::db::StateStore;
use crate::engine::Clock;
use crate::error::Result;
use crate::feed::FeedSource;
use crate::notify::Notifier;
use crate::types::{
    LastNotification, PriceSample, SpikeEvent, SpikeNotificationRecord, SubscriberId,
    TrackedInstrument,
};

// ---------------------------------------------------------------------------
// Decision rule
// ---------------------------------------------------------------------------

/// Percentage move from `base` to `current`, relative to `base`.
/// A zero or negative base disables the comparison.
pub fn percent_change(base: f64, current: f64) -> Option<f64> {
    if base > 0.0 {
        Some((current - base) / base * 100.0)
    } else {
        None
    }
}

/// Cooldown rule, consulted once the 1h change has crossed the threshold.
///
/// Fires when nothing was ever sent, when the price has moved by at least the
/// threshold since the last alert, or when the last alert is older than the
/// cooldown window. The last alerted price stays the baseline even if the
/// market has since reverted to it.
pub fn should_notify(
    current: f64,
    last: Option<LastNotification>,
    now: i64,
    threshold_pct: f64,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    let moved_since_last = percent_change(last.price, current)
        .map_or(false, |change| change.abs() >= threshold_pct);
    moved_since_last || now - last.sent_at > NOTIFY_COOLDOWN_SECS
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstrumentOutcome {
    NoToken,
    NoPrice,
    /// Sample stored; no usable 1h-old price to compare with.
    NoBaseline,
    /// Sample stored; move below threshold.
    Quiet { change_pct: f64 },
    /// Move above threshold but already alerted recently.
    Suppressed { change_pct: f64 },
    Notified { change_pct: f64 },
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanSummary {
    pub instruments: usize,
    pub no_token: usize,
    pub no_price: usize,
    pub sampled: usize,
    pub spikes: usize,
    pub suppressed: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

impl ScanSummary {
    fn record(&mut self, outcome: InstrumentOutcome) {
        match outcome {
            InstrumentOutcome::NoToken => self.no_token += 1,
            InstrumentOutcome::NoPrice => self.no_price += 1,
            InstrumentOutcome::NoBaseline | InstrumentOutcome::Quiet { .. } => self.sampled += 1,
            InstrumentOutcome::Suppressed { .. } => {
                self.sampled += 1;
                self.suppressed += 1;
            }
            InstrumentOutcome::Notified { .. } => {
                self.sampled += 1;
                self.spikes += 1;
            }
        }
    }
}

/// One background pass over the tracked instruments. Instruments are
/// evaluated one after another with a pacing delay; a failure on one never
/// stops the rest.
pub struct SpikeScanner {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn StateStore>,
    notifier: Arc<Notifier>,
    threshold_pct: f64,
    pacing: Duration,
    clock: Clock,
}

impl SpikeScanner {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn StateStore>,
        notifier: Arc<Notifier>,
        threshold_pct: f64,
        pacing: Duration,
        clock: Clock,
    ) -> Self {
        Self { feed, store, notifier, threshold_pct, pacing, clock }
    }

    pub async fn run(&self, instruments: Vec<TrackedInstrument>) -> ScanSummary {
        let started = Instant::now();
        let mut summary = ScanSummary { instruments: instruments.len(), ..Default::default() };

        let subscribers = match self.store.list_subscribers().await {
            Ok(s) => s,
            Err(e) => {
                error!("Price scan aborted, cannot load subscribers: {e}");
                summary.failures += 1;
                summary.elapsed = started.elapsed();
                return summary;
            }
        };
        if !self.notifier.has_destination(&subscribers) {
            debug!("Price scan skipped: no channel and no subscribers");
            summary.elapsed = started.elapsed();
            return summary;
        }

        for inst in &instruments {
            match self.scan_instrument(inst, &subscribers).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    summary.failures += 1;
                    error!(
                        instrument_id = %inst.instrument_id,
                        "Price check failed for {}: {e}",
                        inst.display_title,
                    );
                }
            }
            if inst.price_token_id.is_some() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        summary.elapsed = started.elapsed();
        summary
    }

    pub async fn scan_instrument(
        &self,
        inst: &TrackedInstrument,
        subscribers: &[SubscriberId],
    ) -> Result<InstrumentOutcome> {
        let Some(token_id) = inst.price_token_id.as_deref() else {
            return Ok(InstrumentOutcome::NoToken);
        };
        let Some(current) = self
            .feed
            .fetch_token_price(token_id, Some(&inst.market_id_hint))
            .await
        else {
            return Ok(InstrumentOutcome::NoPrice);
        };

        let now = (self.clock)();
        let old = self
            .store
            .price_at_or_before(&inst.instrument_id, now - PRICE_LOOKBACK_SECS)
            .await?;

        let outcome = match old.and_then(|old| percent_change(old, current)) {
            None => InstrumentOutcome::NoBaseline,
            Some(change_pct) if change_pct.abs() < self.threshold_pct => {
                InstrumentOutcome::Quiet { change_pct }
            }
            Some(change_pct) => {
                let last = self.store.last_notification(&inst.instrument_id).await?;
                if should_notify(current, last, now, self.threshold_pct) {
                    let event = SpikeEvent {
                        instrument: inst.clone(),
                        change_pct,
                        current_price: current,
                    };
                    info!(
                        instrument_id = %inst.instrument_id,
                        change_pct,
                        price = current,
                        direction = %event.direction(),
                        "Spike alert for {}",
                        inst.display_title,
                    );
                    self.notifier.announce_spike(subscribers, &event).await;
                    self.store
                        .record_notification(&SpikeNotificationRecord {
                            market_id: inst.instrument_id.clone(),
                            token_id: token_id.to_string(),
                            price: current,
                            sent_at: now,
                        })
                        .await?;
                    InstrumentOutcome::Notified { change_pct }
                } else {
                    debug!(
                        instrument_id = %inst.instrument_id,
                        change_pct,
                        "Spike already announced, suppressed",
                    );
                    InstrumentOutcome::Suppressed { change_pct }
                }
            }
        };

        self.store
            .append_price_sample(&PriceSample {
                market_id: inst.instrument_id.clone(),
                token_id: token_id.to_string(),
                price: current,
                sampled_at: now,
            })
            .await?;

        Ok(outcome)
    }
}
