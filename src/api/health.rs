//! Shared counters for the /health endpoint.
//! Updated by the polling hub and the notification dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Completed event-board poll cycles.
    board_cycles: AtomicU64,
    /// Completed dashboard refresh cycles.
    dashboard_cycles: AtomicU64,
    /// Epoch millis of the last published board (0 = none yet).
    last_board_at_ms: AtomicU64,
    notifications_dispatched: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_board_cycle(&self, at_ms: u64) {
        self.board_cycles.fetch_add(1, Ordering::Relaxed);
        self.last_board_at_ms.store(at_ms, Ordering::Relaxed);
    }

    pub fn record_dashboard_cycle(&self) {
        self.dashboard_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_dispatched(&self) {
        self.notifications_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn board_cycles(&self) -> u64 {
        self.board_cycles.load(Ordering::Relaxed)
    }

    pub fn dashboard_cycles(&self) -> u64 {
        self.dashboard_cycles.load(Ordering::Relaxed)
    }

    pub fn last_board_at_ms(&self) -> u64 {
        self.last_board_at_ms.load(Ordering::Relaxed)
    }

    pub fn notifications_dispatched(&self) -> u64 {
        self.notifications_dispatched.load(Ordering::Relaxed)
    }
}
