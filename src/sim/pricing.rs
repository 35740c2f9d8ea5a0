use std::sync::Arc;

use crate::config::pricing_factors::*;
use crate::config::MAX_RANDOM_HOURS_TO_EVENT;
use crate::sim::RandomSource;
use crate::state::EventCatalog;
use crate::types::{DemandLevel, PriceDirection, PriceQuote};

/// Synthetic ticket pricing: base price scaled by time-to-event and demand
/// bands plus a small random volatility.
pub struct PricingSimulator {
    catalog: Arc<EventCatalog>,
    rng: Arc<dyn RandomSource>,
}

impl PricingSimulator {
    pub fn new(catalog: Arc<EventCatalog>, rng: Arc<dyn RandomSource>) -> Self {
        Self { catalog, rng }
    }

    /// Quote with a randomly drawn time-to-event in [0, 720) hours.
    pub fn quote(&self, event_id: &str) -> PriceQuote {
        let hours = self.rng.uniform(0.0, MAX_RANDOM_HOURS_TO_EVENT);
        self.quote_at(event_id, hours)
    }

    pub fn quote_at(&self, event_id: &str, hours_to_event: f64) -> PriceQuote {
        let base = self.catalog.base_price(event_id);
        let demand = self.catalog.demand_level(event_id);

        let noise = self.rng.uniform(-VOLATILITY, VOLATILITY);
        let multiplier = price_multiplier(hours_to_event, demand) + noise;
        let current_amount = (base as f64 * multiplier).round().max(0.0) as i64;

        let direction = PriceDirection::between(current_amount, base);
        let percent_change = percent_change(current_amount, base);

        PriceQuote {
            event_id: event_id.to_string(),
            current_amount,
            original_amount: (current_amount != base).then_some(base),
            direction,
            percent_change,
            trend_label: trend_label(direction, percent_change).to_string(),
            hours_to_event,
        }
    }
}

/// Deterministic part of the multiplier. The two time bands are exclusive:
/// inside 24h only the surge bonus applies.
pub fn price_multiplier(hours_to_event: f64, demand: DemandLevel) -> f64 {
    let mut multiplier = 1.0;

    if hours_to_event < SURGE_UNDER_HOURS {
        multiplier += SURGE_BONUS;
    } else if hours_to_event < WEEK_UNDER_HOURS {
        multiplier += WEEK_BONUS;
    }

    match demand {
        DemandLevel::High => multiplier += HIGH_DEMAND_BONUS,
        DemandLevel::Low => multiplier -= LOW_DEMAND_PENALTY,
        DemandLevel::Medium => {}
    }

    multiplier
}

/// |current − base| / base in percent, one decimal.
fn percent_change(current: i64, base: i64) -> f64 {
    if base <= 0 {
        return 0.0;
    }
    let pct = (current - base).abs() as f64 / base as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

fn trend_label(direction: PriceDirection, percent_change: f64) -> &'static str {
    match direction {
        PriceDirection::Up if percent_change > 10.0 => "Surging",
        PriceDirection::Up => "Rising",
        PriceDirection::Down => "Falling",
        PriceDirection::Stable => "Steady",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::random::ScriptedSource;
    use crate::sim::SeededSource;

    fn simulator(rng: Arc<dyn RandomSource>) -> PricingSimulator {
        PricingSimulator::new(EventCatalog::new(), rng)
    }

    #[test]
    fn amount_is_non_negative_and_direction_matches_sign() {
        let sim = simulator(Arc::new(SeededSource::new(Some(11))));
        let mut ids: Vec<&str> = EventCatalog::new().event_ids();
        ids.push("unknown-fixture");

        for id in ids {
            for _ in 0..200 {
                let q = sim.quote(id);
                let base = EventCatalog::new().base_price(id);
                assert!(q.current_amount >= 0);
                assert_eq!(q.direction, PriceDirection::between(q.current_amount, base));
                assert_eq!(q.original_amount.is_some(), q.current_amount != base);
                assert!((0.0..MAX_RANDOM_HOURS_TO_EVENT).contains(&q.hours_to_event));
            }
        }
    }

    #[test]
    fn cricket_final_inside_a_day_is_in_surge_band() {
        // 0.0 → noise at its floor of -0.025
        let sim = simulator(Arc::new(ScriptedSource::constant(0.0)));
        let q = sim.quote_at("cricket-final", 10.0);
        assert!(q.current_amount as f64 >= 5000.0 * 1.2, "amount={}", q.current_amount);
        assert_eq!(q.direction, PriceDirection::Up);
        assert_eq!(q.trend_label, "Surging");
    }

    #[test]
    fn multiplier_bands() {
        assert!((price_multiplier(10.0, DemandLevel::Medium) - 1.2).abs() < 1e-9);
        assert!((price_multiplier(100.0, DemandLevel::Medium) - 1.1).abs() < 1e-9);
        assert!((price_multiplier(500.0, DemandLevel::Medium) - 1.0).abs() < 1e-9);
        assert!((price_multiplier(10.0, DemandLevel::High) - 1.35).abs() < 1e-9);
        assert!((price_multiplier(500.0, DemandLevel::Low) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn unknown_event_prices_from_default_base() {
        // 0.5 → zero noise; default popularity 0.6 is medium demand
        let sim = simulator(Arc::new(ScriptedSource::constant(0.5)));
        let q = sim.quote_at("unknown-fixture", 500.0);
        assert_eq!(q.current_amount, 2000);
        assert_eq!(q.direction, PriceDirection::Stable);
        assert_eq!(q.original_amount, None);
        assert_eq!(q.percent_change, 0.0);
    }

    #[test]
    fn low_demand_far_out_prices_down() {
        // hockey-semis: base 1800, popularity 0.45 → low
        let sim = simulator(Arc::new(ScriptedSource::constant(0.5)));
        let q = sim.quote_at("hockey-semis", 500.0);
        assert_eq!(q.current_amount, 1620);
        assert_eq!(q.direction, PriceDirection::Down);
        assert_eq!(q.original_amount, Some(1800));
        assert!((q.percent_change - 10.0).abs() < 1e-9);
    }
}
