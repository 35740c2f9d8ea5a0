use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::{METRICS_CACHE_KEY, METRICS_CACHE_TIMESTAMP_KEY, METRICS_CACHE_TTL_SECS};
use crate::db::KvStore;
use crate::sim::{Clock, RandomSource};
use crate::state::EventCatalog;
use crate::types::{BusinessInsight, DashboardMetricsSnapshot, SalesPrediction};

struct CachedMetrics {
    written_at: DateTime<Utc>,
    snapshot: DashboardMetricsSnapshot,
}

/// Randomized business KPIs behind a 5-minute cache.
///
/// The cache lives in a [`KvStore`] under a payload key and a timestamp key.
/// Store failures are logged and swallowed; an in-memory copy with the same
/// TTL keeps the numbers stable for the rest of the session.
pub struct DashboardMetricsSimulator<S: KvStore> {
    store: S,
    catalog: Arc<EventCatalog>,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    fallback: Mutex<Option<CachedMetrics>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: KvStore> DashboardMetricsSimulator<S> {
    pub fn new(
        store: S,
        catalog: Arc<EventCatalog>,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            rng,
            clock,
            fallback: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached snapshot if younger than the TTL, otherwise a freshly generated one.
    pub async fn current(&self) -> DashboardMetricsSnapshot {
        let now = self.clock.now();

        match self.read_store(now).await {
            Ok(Some(snapshot)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return snapshot;
            }
            // A clean miss still consults memory: the last write may have failed.
            Ok(None) | Err(()) => {
                if let Some(snapshot) = self.read_fallback(now) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return snapshot;
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.generate(now);
        self.write_store(&snapshot, now).await;
        self.remember(&snapshot, now);
        snapshot
    }

    /// Drops the persisted entry and the in-memory copy.
    pub async fn invalidate(&self) {
        for key in [METRICS_CACHE_KEY, METRICS_CACHE_TIMESTAMP_KEY] {
            if let Err(e) = self.store.remove(key).await {
                warn!("metrics cache remove failed for {key}: {e}");
            }
        }
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn cache_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// `Ok(None)` is a clean miss; `Err(())` means the store itself failed.
    async fn read_store(&self, now: DateTime<Utc>) -> Result<Option<DashboardMetricsSnapshot>, ()> {
        let raw_ts = self.store.get(METRICS_CACHE_TIMESTAMP_KEY).await.map_err(|e| {
            warn!("metrics cache timestamp read failed: {e}");
        })?;
        let Some(written_at) = raw_ts.and_then(|s| parse_millis(&s)) else {
            return Ok(None);
        };
        if !is_fresh(written_at, now) {
            debug!(age_secs = (now - written_at).num_seconds(), "metrics cache expired");
            return Ok(None);
        }

        let raw = self.store.get(METRICS_CACHE_KEY).await.map_err(|e| {
            warn!("metrics cache payload read failed: {e}");
        })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str::<DashboardMetricsSnapshot>(&raw) {
            Ok(snapshot) => {
                self.remember(&snapshot, written_at);
                Ok(Some(snapshot))
            }
            Err(e) => {
                warn!("metrics cache payload unreadable, regenerating: {e}");
                Ok(None)
            }
        }
    }

    async fn write_store(&self, snapshot: &DashboardMetricsSnapshot, now: DateTime<Utc>) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(p) => p,
            Err(e) => {
                warn!("metrics snapshot serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(METRICS_CACHE_KEY, &payload).await {
            warn!("metrics cache write failed, keeping in-memory copy: {e}");
            return;
        }
        let ts = now.timestamp_millis().to_string();
        if let Err(e) = self.store.set(METRICS_CACHE_TIMESTAMP_KEY, &ts).await {
            warn!("metrics cache timestamp write failed, keeping in-memory copy: {e}");
        }
    }

    fn read_fallback(&self, now: DateTime<Utc>) -> Option<DashboardMetricsSnapshot> {
        let guard = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|c| is_fresh(c.written_at, now))
            .map(|c| c.snapshot.clone())
    }

    fn remember(&self, snapshot: &DashboardMetricsSnapshot, written_at: DateTime<Utc>) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedMetrics {
            written_at,
            snapshot: snapshot.clone(),
        });
    }

    fn generate(&self, now: DateTime<Utc>) -> DashboardMetricsSnapshot {
        let rng = &self.rng;

        let total_revenue = i64::from(rng.uniform_int(2_500_000, 4_000_000));
        let tickets_sold = rng.uniform_int(12_000, 18_000);

        let trends = ["up", "stable", "down"];
        let sales_predictions = self
            .catalog
            .all()
            .iter()
            .take(3)
            .map(|event| SalesPrediction {
                event_name: event.title.to_string(),
                predicted_sales: rng.uniform_int(5_000, 15_000),
                confidence_percent: rng.uniform_int(75, 95) as u8,
                trend: trends[rng.uniform_int(0, 2) as usize].to_string(),
            })
            .collect();

        let insights = vec![
            BusinessInsight {
                kind: "pricing".to_string(),
                message: format!(
                    "Weekend fixtures are converting {}% better than weekday fixtures.",
                    rng.uniform_int(15, 30)
                ),
                recommended_action: "Shift promotional spend toward weekend matches".to_string(),
                impact: format!("+{}% projected revenue", rng.uniform_int(8, 15)),
            },
            BusinessInsight {
                kind: "demand".to_string(),
                message: format!(
                    "Cricket listings drew {}% more searches than last week.",
                    rng.uniform_int(20, 45)
                ),
                recommended_action: "Open additional seating tiers for upcoming cricket fixtures".to_string(),
                impact: format!("+{}% ticket sales", rng.uniform_int(10, 25)),
            },
            BusinessInsight {
                kind: "retention".to_string(),
                message: format!(
                    "{}% of this month's buyers are returning customers.",
                    rng.uniform_int(30, 55)
                ),
                recommended_action: "Offer loyalty point multipliers on repeat bookings".to_string(),
                impact: format!("+{}% repeat purchases", rng.uniform_int(5, 12)),
            },
        ];

        DashboardMetricsSnapshot {
            total_revenue,
            tickets_sold,
            conversion_rate: round1(rng.uniform(2.5, 4.5)),
            average_ticket_price: total_revenue / i64::from(tickets_sold.max(1)),
            active_users: rng.uniform_int(800, 1_500),
            page_views: rng.uniform_int(40_000, 60_000),
            bounce_rate: round1(rng.uniform(30.0, 45.0)),
            customer_satisfaction: round1(rng.uniform(4.2, 4.9)),
            sales_predictions,
            insights,
            generated_at: now,
        }
    }
}

/// Younger than the TTL and not stamped in the future.
pub fn is_fresh(written_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let age = now - written_at;
    age >= Duration::zero() && age < Duration::seconds(METRICS_CACHE_TTL_SECS)
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKvStore;
    use crate::error::{AppError, Result};
    use crate::sim::clock::ManualClock;
    use crate::sim::SeededSource;
    use chrono::TimeZone;

    /// Every access fails, like storage that is disabled or full.
    struct FailingKvStore;

    impl KvStore for FailingKvStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(AppError::Io(std::io::Error::other("storage unavailable")))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::Io(std::io::Error::other("storage unavailable")))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(AppError::Io(std::io::Error::other("storage unavailable")))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap()
    }

    fn simulator<S: KvStore>(store: S, clock: Arc<ManualClock>) -> DashboardMetricsSimulator<S> {
        DashboardMetricsSimulator::new(
            store,
            EventCatalog::new(),
            Arc::new(SeededSource::new(Some(99))),
            clock,
        )
    }

    #[tokio::test]
    async fn second_call_within_ttl_is_identical() {
        let clock = Arc::new(ManualClock::new(start()));
        let sim = simulator(MemoryKvStore::new(), clock.clone());

        let first = sim.current().await;
        clock.advance(Duration::seconds(299));
        let second = sim.current().await;

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(sim.cache_misses(), 1);
        assert_eq!(sim.cache_hits(), 1);
    }

    #[tokio::test]
    async fn call_after_ttl_regenerates() {
        let clock = Arc::new(ManualClock::new(start()));
        let sim = simulator(MemoryKvStore::new(), clock.clone());

        let first = sim.current().await;
        clock.advance(Duration::seconds(300));
        let second = sim.current().await;

        assert_eq!(sim.cache_misses(), 2);
        assert!(second.generated_at > first.generated_at);
    }

    #[tokio::test]
    async fn hit_survives_a_fresh_simulator_on_the_same_store() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = MemoryKvStore::new();
        let first = simulator(store, clock.clone()).current().await;

        // Rebuild a store holding what the first simulator persisted.
        let persisted = MemoryKvStore::new();
        persisted
            .set(METRICS_CACHE_KEY, &serde_json::to_string(&first).unwrap())
            .await
            .unwrap();
        persisted
            .set(METRICS_CACHE_TIMESTAMP_KEY, &start().timestamp_millis().to_string())
            .await
            .unwrap();

        clock.advance(Duration::seconds(60));
        let reloaded = simulator(persisted, clock).current().await;
        assert_eq!(reloaded, first);
    }

    #[tokio::test]
    async fn failing_store_falls_back_to_memory() {
        let clock = Arc::new(ManualClock::new(start()));
        let sim = simulator(FailingKvStore, clock.clone());

        let first = sim.current().await;
        clock.advance(Duration::seconds(120));
        let second = sim.current().await;
        assert_eq!(first, second);

        clock.advance(Duration::seconds(600));
        let third = sim.current().await;
        assert!(third.generated_at > first.generated_at);
    }

    /// Reads succeed but every write is rejected, like storage that is full.
    struct ReadOnlyKvStore;

    impl KvStore for ReadOnlyKvStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::Io(std::io::Error::other("quota exceeded")))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn rejected_writes_fall_back_to_memory() {
        let clock = Arc::new(ManualClock::new(start()));
        let sim = simulator(ReadOnlyKvStore, clock.clone());

        let first = sim.current().await;
        clock.advance(Duration::seconds(60));
        let second = sim.current().await;
        assert_eq!(first, second);
        assert_eq!(sim.cache_hits(), 1);
        assert_eq!(sim.cache_misses(), 1);

        clock.advance(Duration::seconds(300));
        let third = sim.current().await;
        assert!(third.generated_at > first.generated_at);
        assert_eq!(sim.cache_misses(), 2);
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_miss() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = MemoryKvStore::new();
        store.set(METRICS_CACHE_KEY, "{not json").await.unwrap();
        store
            .set(METRICS_CACHE_TIMESTAMP_KEY, &start().timestamp_millis().to_string())
            .await
            .unwrap();

        let sim = simulator(store, clock);
        let snapshot = sim.current().await;
        assert_eq!(sim.cache_misses(), 1);
        assert_eq!(snapshot.sales_predictions.len(), 3);
        assert_eq!(snapshot.insights.len(), 3);
    }

    #[tokio::test]
    async fn invalidate_forces_regeneration() {
        let clock = Arc::new(ManualClock::new(start()));
        let sim = simulator(MemoryKvStore::new(), clock);

        sim.current().await;
        sim.invalidate().await;
        sim.current().await;
        assert_eq!(sim.cache_misses(), 2);
        assert_eq!(sim.cache_hits(), 0);
    }

    #[test]
    fn freshness_window() {
        let t = start();
        assert!(is_fresh(t, t));
        assert!(is_fresh(t, t + Duration::seconds(299)));
        assert!(!is_fresh(t, t + Duration::seconds(300)));
        assert!(!is_fresh(t + Duration::seconds(5), t));
    }
}
