use std::sync::Arc;

use crate::config::demand_thresholds::{MAX_SOLD, MIN_SOLD};
use crate::config::MAX_RANDOM_HOURS_TO_EVENT;
use crate::sim::RandomSource;
use crate::state::EventCatalog;
use crate::types::{DemandLevel, DemandSnapshot};

const SOLD_NOISE: f64 = 0.05;
const TOTAL_TICKETS_MIN: u32 = 50_000;
const TOTAL_TICKETS_MAX: u32 = 70_000;
const BASE_SALES_PER_HOUR: f64 = 50.0;

/// Synthetic sell-through curve: the closer the match, the larger the share of
/// the event's popularity that has already sold.
pub struct DemandSimulator {
    catalog: Arc<EventCatalog>,
    rng: Arc<dyn RandomSource>,
}

impl DemandSimulator {
    pub fn new(catalog: Arc<EventCatalog>, rng: Arc<dyn RandomSource>) -> Self {
        Self { catalog, rng }
    }

    /// Snapshot with a randomly drawn time-to-event in [0, 720) hours.
    pub fn snapshot(&self, event_id: &str) -> DemandSnapshot {
        let hours = self.rng.uniform(0.0, MAX_RANDOM_HOURS_TO_EVENT);
        self.snapshot_at(event_id, hours)
    }

    pub fn snapshot_at(&self, event_id: &str, hours_to_event: f64) -> DemandSnapshot {
        let popularity = self.catalog.popularity(event_id);
        let noise = self.rng.uniform(-SOLD_NOISE, SOLD_NOISE);
        let percent_sold = (popularity * curve_factor(hours_to_event) + noise).clamp(MIN_SOLD, MAX_SOLD);

        let total_tickets = self.rng.uniform_int(TOTAL_TICKETS_MIN, TOTAL_TICKETS_MAX);
        let tickets_sold = ((f64::from(total_tickets) * percent_sold).floor() as u32).min(total_tickets);
        let tickets_remaining = total_tickets - tickets_sold;

        let rate = self.sales_rate_per_hour(hours_to_event);
        let projected_sellout_text = sellout_text(tickets_remaining, rate, hours_to_event);

        DemandSnapshot {
            event_id: event_id.to_string(),
            level: DemandLevel::from_fraction(percent_sold),
            percent_sold,
            tickets_sold,
            tickets_remaining,
            total_tickets,
            projected_sellout_text,
            hours_to_event,
        }
    }

    /// Tickets per hour: 50 × urgency (1–3×) × random 0.5–1.5.
    fn sales_rate_per_hour(&self, hours_to_event: f64) -> f64 {
        let urgency = if hours_to_event < 24.0 {
            3.0
        } else if hours_to_event < 168.0 {
            2.0
        } else {
            1.0
        };
        BASE_SALES_PER_HOUR * urgency * self.rng.uniform(0.5, 1.5)
    }
}

/// Share of popularity already sold, bucketed by days out.
fn curve_factor(hours_to_event: f64) -> f64 {
    let days = hours_to_event / 24.0;
    if days > 30.0 {
        0.2
    } else if days > 14.0 {
        0.4
    } else if days > 7.0 {
        0.6
    } else if days > 3.0 {
        0.8
    } else {
        0.95
    }
}

fn sellout_text(remaining: u32, rate_per_hour: f64, hours_to_event: f64) -> String {
    if remaining == 0 {
        return "Sold out".to_string();
    }
    if rate_per_hour <= 0.0 {
        return "Unlikely to sell out before kickoff".to_string();
    }

    let hours_needed = f64::from(remaining) / rate_per_hour;
    if hours_needed > hours_to_event {
        "Unlikely to sell out before kickoff".to_string()
    } else if hours_needed < 1.0 {
        "Less than an hour".to_string()
    } else if hours_needed < 24.0 {
        format!("About {} hours", hours_needed.ceil() as u64)
    } else {
        format!("About {} days", (hours_needed / 24.0).ceil() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::random::ScriptedSource;
    use crate::sim::SeededSource;

    #[test]
    fn sold_fraction_clamped_and_counts_add_up() {
        let sim = DemandSimulator::new(EventCatalog::new(), Arc::new(SeededSource::new(Some(3))));
        let mut ids = EventCatalog::new().event_ids();
        ids.push("unknown-fixture");

        for id in ids {
            for _ in 0..200 {
                let d = sim.snapshot(id);
                assert!((0.10..=0.98).contains(&d.percent_sold), "percent_sold={}", d.percent_sold);
                assert_eq!(d.tickets_sold + d.tickets_remaining, d.total_tickets);
                assert!((50_000..=70_000).contains(&d.total_tickets));
                assert_eq!(d.level, DemandLevel::from_fraction(d.percent_sold));
            }
        }
    }

    #[test]
    fn cricket_final_close_to_kickoff_is_high_demand() {
        // 0.5 everywhere: zero noise, 60_000 tickets, 1.0× rate jitter
        let sim = DemandSimulator::new(EventCatalog::new(), Arc::new(ScriptedSource::constant(0.5)));
        let d = sim.snapshot_at("cricket-final", 10.0);
        assert!(d.percent_sold > 0.8);
        assert_eq!(d.level, DemandLevel::High);
        assert_eq!(d.projected_sellout_text, "Unlikely to sell out before kickoff");
    }

    #[test]
    fn far_out_low_popularity_hits_floor() {
        // hockey-semis popularity 0.45 × 0.2 = 0.09, noise at -0.05 → clamped
        let sim = DemandSimulator::new(EventCatalog::new(), Arc::new(ScriptedSource::constant(0.0)));
        let d = sim.snapshot_at("hockey-semis", 1_000.0);
        assert!((d.percent_sold - 0.10).abs() < 1e-9);
        assert_eq!(d.level, DemandLevel::Low);
    }

    #[test]
    fn curve_buckets() {
        assert_eq!(curve_factor(31.0 * 24.0), 0.2);
        assert_eq!(curve_factor(20.0 * 24.0), 0.4);
        assert_eq!(curve_factor(10.0 * 24.0), 0.6);
        assert_eq!(curve_factor(5.0 * 24.0), 0.8);
        assert_eq!(curve_factor(24.0), 0.95);
    }

    #[test]
    fn sellout_text_variants() {
        assert_eq!(sellout_text(0, 100.0, 10.0), "Sold out");
        assert_eq!(sellout_text(50, 100.0, 10.0), "Less than an hour");
        assert_eq!(sellout_text(450, 100.0, 10.0), "About 5 hours");
        assert_eq!(sellout_text(5_000, 100.0, 500.0), "About 3 days");
        assert_eq!(sellout_text(5_000, 100.0, 10.0), "Unlikely to sell out before kickoff");
    }
}
