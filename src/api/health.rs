//! Shared health state for the /health endpoint.
//! Written by the scan coordinator only, read by the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    /// Unix seconds of the last coordinator tick (0 = none yet).
    last_tick_at: AtomicI64,
    /// Mirror of the coordinator's scan state.
    scan_in_flight: AtomicBool,
    ticks: AtomicU64,
    scans_launched: AtomicU64,
    scans_skipped: AtomicU64,
    announcements: AtomicU64,
    spikes: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub last_tick_at: Option<i64>,
    pub scan_in_flight: bool,
    pub ticks: u64,
    pub scans_launched: u64,
    pub scans_skipped: u64,
    pub announcements: u64,
    pub spikes: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, now: i64) {
        self.last_tick_at.store(now, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_launched(&self) {
        self.scans_launched.fetch_add(1, Ordering::Relaxed);
        self.set_scan_in_flight(true);
    }

    pub fn record_scan_skipped(&self) {
        self.scans_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_scan_in_flight(&self, v: bool) {
        self.scan_in_flight.store(v, Ordering::Relaxed);
    }

    pub fn record_announcement(&self) {
        self.announcements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spikes(&self, n: u64) {
        self.spikes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let last = self.last_tick_at.load(Ordering::Relaxed);
        HealthSnapshot {
            last_tick_at: (last > 0).then_some(last),
            scan_in_flight: self.scan_in_flight.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            scans_launched: self.scans_launched.load(Ordering::Relaxed),
            scans_skipped: self.scans_skipped.load(Ordering::Relaxed),
            announcements: self.announcements.load(Ordering::Relaxed),
            spikes: self.spikes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_sets_the_mirror_flag() {
        let h = HealthState::new();
        assert_eq!(h.snapshot().last_tick_at, None);

        h.record_tick(1_000);
        h.record_scan_launched();
        let s = h.snapshot();
        assert_eq!(s.last_tick_at, Some(1_000));
        assert!(s.scan_in_flight);
        assert_eq!(s.scans_launched, 1);

        h.set_scan_in_flight(false);
        assert!(!h.snapshot().scan_in_flight);
    }
}
