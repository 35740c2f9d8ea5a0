use std::sync::Arc;

use crate::db::KvStore;
use crate::sim::{
    Clock, DashboardMetricsSimulator, DemandSimulator, InsightGenerator, PricingSimulator, RandomSource,
};
use crate::state::EventCatalog;
use crate::types::{EventBoard, EventBoardEntry};

/// The simulators wired to one catalog, random source and clock. Built once
/// in `main` and shared by the polling hub and the HTTP handlers.
pub struct Engine<S: KvStore> {
    pub catalog: Arc<EventCatalog>,
    pub pricing: PricingSimulator,
    pub demand: DemandSimulator,
    pub insights: InsightGenerator,
    pub dashboard: DashboardMetricsSimulator<S>,
    pub rng: Arc<dyn RandomSource>,
    pub clock: Arc<dyn Clock>,
}

impl<S: KvStore> Engine<S> {
    pub fn new(
        catalog: Arc<EventCatalog>,
        store: S,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pricing: PricingSimulator::new(Arc::clone(&catalog), Arc::clone(&rng)),
            demand: DemandSimulator::new(Arc::clone(&catalog), Arc::clone(&rng)),
            insights: InsightGenerator::new(Arc::clone(&rng), Arc::clone(&clock)),
            dashboard: DashboardMetricsSimulator::new(store, Arc::clone(&catalog), Arc::clone(&rng), Arc::clone(&clock)),
            catalog,
            rng,
            clock,
        }
    }

    /// Fresh quote, demand and insights for one event. `hours` pins the
    /// time-to-event for both simulators; otherwise each draws its own.
    pub fn board_entry(&self, event_id: &str, hours: Option<f64>) -> EventBoardEntry {
        let (quote, demand) = match hours {
            Some(h) => (self.pricing.quote_at(event_id, h), self.demand.snapshot_at(event_id, h)),
            None => (self.pricing.quote(event_id), self.demand.snapshot(event_id)),
        };
        let title = self.catalog.title(event_id);
        let insights = self.insights.generate(&title, &quote, &demand);

        EventBoardEntry {
            event_id: event_id.to_string(),
            title,
            quote,
            demand,
            insights,
        }
    }

    /// One entry per catalog event.
    pub fn board(&self) -> EventBoard {
        EventBoard {
            generated_at: Some(self.clock.now()),
            entries: self
                .catalog
                .event_ids()
                .into_iter()
                .map(|id| self.board_entry(id, None))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKvStore;
    use crate::sim::{SeededSource, SystemClock};
    use crate::types::DemandLevel;

    fn engine() -> Engine<MemoryKvStore> {
        Engine::new(
            EventCatalog::new(),
            MemoryKvStore::new(),
            Arc::new(SeededSource::new(Some(1))),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn board_covers_every_catalog_event() {
        let engine = engine();
        let board = engine.board();
        assert!(board.generated_at.is_some());
        assert_eq!(board.entries.len(), engine.catalog.len());
        for (entry, id) in board.entries.iter().zip(engine.catalog.event_ids()) {
            assert_eq!(entry.event_id, id);
            assert_eq!(entry.quote.event_id, id);
            assert_eq!(entry.demand.event_id, id);
        }
    }

    #[test]
    fn pinned_hours_apply_to_both_simulators() {
        let entry = engine().board_entry("cricket-final", Some(10.0));
        assert_eq!(entry.quote.hours_to_event, 10.0);
        assert_eq!(entry.demand.hours_to_event, 10.0);
        assert!(entry.quote.current_amount >= 6000);
        // 0.9 × 0.95 ± 0.05 never drops to 0.8 or below
        assert_eq!(entry.demand.level, DemandLevel::High);
        assert!(entry.insights.iter().any(|i| i.title == "High Demand"));
    }
}
