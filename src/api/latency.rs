//! Poll-cycle compute time, one histogram per cycle kind.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Board,
    Dashboard,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

/// Values are recorded in microseconds, 1us to 60s, 3 significant figures.
pub struct CycleLatency {
    board: Mutex<Option<Histogram<u64>>>,
    dashboard: Mutex<Option<Histogram<u64>>>,
}

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::new_with_bounds(1, 60_000_000, 3).ok()
}

impl CycleLatency {
    pub fn new() -> Self {
        Self {
            board: Mutex::new(new_histogram()),
            dashboard: Mutex::new(new_histogram()),
        }
    }

    fn slot(&self, kind: CycleKind) -> &Mutex<Option<Histogram<u64>>> {
        match kind {
            CycleKind::Board => &self.board,
            CycleKind::Dashboard => &self.dashboard,
        }
    }

    pub fn record(&self, kind: CycleKind, d: Duration) {
        let us = d.as_micros().clamp(1, 60_000_000) as u64;
        let mut guard = self.slot(kind).lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(h) = guard.as_mut() {
            let _ = h.record(us);
        }
    }

    pub fn summary(&self, kind: CycleKind) -> LatencySummary {
        let guard = self.slot(kind).lock().unwrap_or_else(PoisonError::into_inner);
        let Some(h) = guard.as_ref().filter(|h| h.len() > 0) else {
            return LatencySummary::default();
        };
        let ms = |q: f64| Some(h.value_at_quantile(q) as f64 / 1_000.0);
        LatencySummary {
            p50_ms: ms(0.5),
            p95_ms: ms(0.95),
            p99_ms: ms(0.99),
            sample_count: h.len(),
        }
    }
}

impl Default for CycleLatency {
    fn default() -> Self {
        Self::new()
    }
}
