use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{CycleKind, CycleLatency};
use crate::config::insight_thresholds::DROP_PERCENT;
use crate::db::KvStore;
use crate::engine::Engine;
use crate::notify::dispatcher::notification;
use crate::types::{
    DashboardMetricsSnapshot, EventBoard, EventBoardEntry, Notification, NotificationKind, PriceDirection,
};

pub type MetricsSender = watch::Sender<Option<Arc<DashboardMetricsSnapshot>>>;

/// Receivers handed to anything that wants the latest polled data.
#[derive(Clone)]
pub struct PollSubscriptions {
    pub board: watch::Receiver<Arc<EventBoard>>,
    pub metrics: watch::Receiver<Option<Arc<DashboardMetricsSnapshot>>>,
}

/// The single timer owner. Re-runs the event board every `board_every` and the
/// dashboard metrics every `dashboard_every`, publishing each result to all
/// subscribers. Both intervals fire immediately on start.
pub struct PollingHub<S: KvStore> {
    engine: Arc<Engine<S>>,
    board_tx: watch::Sender<Arc<EventBoard>>,
    metrics_tx: Arc<MetricsSender>,
    notify_tx: mpsc::Sender<Notification>,
    health: Arc<HealthState>,
    latency: Arc<CycleLatency>,
    board_every: Duration,
    dashboard_every: Duration,
    /// Events that already had a price-drop notification for the current dip.
    dropped: HashSet<String>,
    /// Events that already had a match reminder.
    reminded: HashSet<String>,
}

impl<S: KvStore> PollingHub<S> {
    pub fn new(
        engine: Arc<Engine<S>>,
        notify_tx: mpsc::Sender<Notification>,
        health: Arc<HealthState>,
        latency: Arc<CycleLatency>,
        board_every: Duration,
        dashboard_every: Duration,
    ) -> (Self, PollSubscriptions) {
        let (board_tx, board_rx) = watch::channel(Arc::new(EventBoard::default()));
        let (metrics_tx, metrics_rx) = watch::channel(None);
        let hub = Self {
            engine,
            board_tx,
            metrics_tx: Arc::new(metrics_tx),
            notify_tx,
            health,
            latency,
            board_every,
            dashboard_every,
            dropped: HashSet::new(),
            reminded: HashSet::new(),
        };
        let subs = PollSubscriptions {
            board: board_rx,
            metrics: metrics_rx,
        };
        (hub, subs)
    }

    /// Lets on-demand callers republish metrics they recomputed outside a poll.
    pub fn metrics_publisher(&self) -> Arc<MetricsSender> {
        Arc::clone(&self.metrics_tx)
    }

    /// Runs until `shutdown` flips to true or its sender is dropped. Both
    /// timers are dropped on return.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut board_ticker = interval(self.board_every);
        board_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut dashboard_ticker = interval(self.dashboard_every);
        dashboard_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            board_secs = self.board_every.as_secs_f64(),
            dashboard_secs = self.dashboard_every.as_secs_f64(),
            "Polling hub started"
        );

        loop {
            tokio::select! {
                _ = board_ticker.tick() => self.poll_board(),
                _ = dashboard_ticker.tick() => self.poll_dashboard().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Polling hub stopped");
    }

    fn poll_board(&mut self) {
        let started = Instant::now();
        let board = self.engine.board();
        self.latency.record(CycleKind::Board, started.elapsed());

        for entry in &board.entries {
            self.notify_for(entry);
        }

        let urgent = board
            .entries
            .iter()
            .flat_map(|e| e.insights.iter())
            .filter(|i| i.is_urgent)
            .count();
        debug!(
            event = "BOARD_POLL",
            events = board.entries.len(),
            urgent_insights = urgent,
            elapsed_us = started.elapsed().as_micros() as u64,
            "event board refreshed"
        );

        let at_ms = board
            .generated_at
            .map_or(0, |t| t.timestamp_millis().max(0) as u64);
        self.board_tx.send_replace(Arc::new(board));
        self.health.record_board_cycle(at_ms);
    }

    async fn poll_dashboard(&mut self) {
        let started = Instant::now();
        let metrics = self.engine.dashboard.current().await;
        self.latency.record(CycleKind::Dashboard, started.elapsed());

        debug!(
            event = "DASHBOARD_POLL",
            revenue = metrics.total_revenue,
            cache_hits = self.engine.dashboard.cache_hits(),
            cache_misses = self.engine.dashboard.cache_misses(),
            "dashboard metrics refreshed"
        );
        self.metrics_tx.send_replace(Some(Arc::new(metrics)));
        self.health.record_dashboard_cycle();
    }

    /// Price drops notify once per dip; reminders once per event inside 24h.
    fn notify_for(&mut self, entry: &EventBoardEntry) {
        let quote = &entry.quote;
        let is_drop = quote.direction == PriceDirection::Down && quote.percent_change > DROP_PERCENT;

        if is_drop {
            if self.dropped.insert(entry.event_id.clone()) {
                self.send(notification(
                    NotificationKind::PriceDrop,
                    json!({
                        "eventId": entry.event_id,
                        "eventTitle": entry.title,
                        "oldPrice": quote.original_amount,
                        "newPrice": quote.current_amount,
                        "percentChange": quote.percent_change,
                    }),
                ));
            }
        } else {
            self.dropped.remove(&entry.event_id);
        }

        if quote.hours_to_event < 24.0 && self.reminded.insert(entry.event_id.clone()) {
            let venue = self
                .engine
                .catalog
                .get(&entry.event_id)
                .map_or("the venue", |e| e.venue);
            self.send(notification(
                NotificationKind::MatchReminder,
                json!({
                    "eventId": entry.event_id,
                    "eventTitle": entry.title,
                    "venue": venue,
                    "hoursToEvent": quote.hours_to_event,
                }),
            ));
        }
    }

    fn send(&self, n: Notification) {
        if let Err(e) = self.notify_tx.try_send(n) {
            warn!("notification channel full, dropping: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKvStore;
    use crate::sim::{SeededSource, SystemClock};
    use crate::state::EventCatalog;

    fn engine() -> Arc<Engine<MemoryKvStore>> {
        Arc::new(Engine::new(
            EventCatalog::new(),
            MemoryKvStore::new(),
            Arc::new(SeededSource::new(Some(21))),
            Arc::new(SystemClock),
        ))
    }

    #[tokio::test]
    async fn publishes_board_and_metrics_then_stops_on_shutdown() {
        let (notify_tx, _notify_rx) = mpsc::channel(1024);
        let health = Arc::new(HealthState::new());
        let (hub, mut subs) = PollingHub::new(
            engine(),
            notify_tx,
            health.clone(),
            Arc::new(CycleLatency::new()),
            Duration::from_millis(20),
            Duration::from_secs(3600),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(hub.run(shutdown_rx));

        tokio::time::timeout(Duration::from_secs(5), subs.board.changed())
            .await
            .expect("board published in time")
            .unwrap();
        assert_eq!(subs.board.borrow().entries.len(), EventCatalog::new().len());

        tokio::time::timeout(Duration::from_secs(5), subs.metrics.wait_for(Option::is_some))
            .await
            .expect("metrics published in time")
            .unwrap();

        // A second board cycle proves the short interval keeps firing.
        tokio::time::timeout(Duration::from_secs(5), subs.board.changed())
            .await
            .expect("second board in time")
            .unwrap();
        assert!(health.board_cycles() >= 2);
        assert_eq!(health.dashboard_cycles(), 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("hub stops after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn reminders_are_sent_once_per_event() {
        let (notify_tx, mut notify_rx) = mpsc::channel(1024);
        let (mut hub, _subs) = PollingHub::new(
            engine(),
            notify_tx,
            Arc::new(HealthState::new()),
            Arc::new(CycleLatency::new()),
            Duration::from_secs(30),
            Duration::from_secs(300),
        );

        let entry = hub.engine.board_entry("cricket-final", Some(5.0));
        hub.notify_for(&entry);
        hub.notify_for(&entry);

        let mut reminders = 0;
        while let Ok(n) = notify_rx.try_recv() {
            if n.kind == NotificationKind::MatchReminder {
                reminders += 1;
                assert_eq!(n.data["eventId"], "cricket-final");
            }
        }
        assert_eq!(reminders, 1);
    }

    #[tokio::test]
    async fn price_drop_notifies_once_per_dip() {
        let (notify_tx, mut notify_rx) = mpsc::channel(1024);
        let (mut hub, _subs) = PollingHub::new(
            engine(),
            notify_tx,
            Arc::new(HealthState::new()),
            Arc::new(CycleLatency::new()),
            Duration::from_secs(30),
            Duration::from_secs(300),
        );

        // hockey-semis far out is low demand: multiplier 0.9 ± 0.025, always a >5% drop
        let dip = hub.engine.board_entry("hockey-semis", Some(500.0));
        assert_eq!(dip.quote.direction, PriceDirection::Down);
        hub.notify_for(&dip);
        hub.notify_for(&dip);

        // Inside a day the surge band lifts it back above base, ending the dip.
        let recovered = hub.engine.board_entry("hockey-semis", Some(10.0));
        assert_eq!(recovered.quote.direction, PriceDirection::Up);
        hub.notify_for(&recovered);
        hub.notify_for(&dip);

        let drops = std::iter::from_fn(|| notify_rx.try_recv().ok())
            .filter(|n| n.kind == NotificationKind::PriceDrop)
            .count();
        assert_eq!(drops, 2);
    }
}
