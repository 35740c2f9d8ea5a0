use std::sync::Arc;

use crate::config::insight_thresholds::*;
use crate::sim::{Clock, RandomSource};
use crate::types::{DemandLevel, DemandSnapshot, Insight, InsightCategory, PriceDirection, PriceQuote};

/// Turns one event's quote and demand snapshot into display insights.
/// Rules are evaluated independently, so several can fire for one event.
/// Exactly one random draw is consumed per call (the recommendation roll).
pub struct InsightGenerator {
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl InsightGenerator {
    pub fn new(rng: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        Self { rng, clock }
    }

    pub fn generate(&self, event_title: &str, quote: &PriceQuote, demand: &DemandSnapshot) -> Vec<Insight> {
        let mut out = Vec::new();
        let pct = quote.percent_change;

        if quote.direction == PriceDirection::Up && pct > SURGE_PERCENT {
            out.push(self.insight(
                &quote.event_id,
                InsightCategory::Pricing,
                "Price Surge Detected",
                format!("Prices for {event_title} are up {pct:.1}% over base. Book soon to lock in today's rate."),
                87,
                pct > SURGE_URGENT_PERCENT,
            ));
        }

        if quote.direction == PriceDirection::Down && pct > DROP_PERCENT {
            out.push(self.insight(
                &quote.event_id,
                InsightCategory::Pricing,
                "Price Drop Alert",
                format!("{event_title} is {pct:.1}% below its usual price right now."),
                82,
                false,
            ));
        }

        if demand.level == DemandLevel::High && demand.tickets_remaining < LIMITED_TICKETS {
            out.push(self.insight(
                &demand.event_id,
                InsightCategory::Alert,
                "Limited Availability",
                format!("Only {} tickets left for {event_title}.", demand.tickets_remaining),
                95,
                demand.tickets_remaining < LIMITED_URGENT_TICKETS,
            ));
        }

        if demand.level == DemandLevel::High {
            out.push(self.insight(
                &demand.event_id,
                InsightCategory::Demand,
                "High Demand",
                format!(
                    "{:.0}% of seats for {event_title} are gone. Sellout estimate: {}.",
                    demand.percent_sold * 100.0,
                    demand.projected_sellout_text.to_lowercase(),
                ),
                90,
                false,
            ));
        }

        // No personalization signal exists; this fires on a 30% roll.
        let roll = self.rng.next_unit();
        if roll > MATCH_DRAW_ABOVE {
            let confidence = 70 + ((roll - MATCH_DRAW_ABOVE) / (1.0 - MATCH_DRAW_ABOVE) * 25.0) as u8;
            out.push(self.insight(
                &quote.event_id,
                InsightCategory::Recommendation,
                "Perfect Match Found",
                format!("{event_title} lines up with the fixtures you usually book."),
                confidence.min(95),
                false,
            ));
        }

        out
    }

    fn insight(
        &self,
        event_id: &str,
        category: InsightCategory,
        title: &str,
        message: String,
        confidence_percent: u8,
        is_urgent: bool,
    ) -> Insight {
        let created_at = self.clock.now();
        Insight {
            id: format!("{event_id}-{category}-{}", created_at.timestamp_millis()),
            event_id: event_id.to_string(),
            category,
            title: title.to_string(),
            message,
            confidence_percent,
            created_at,
            is_urgent,
        }
    }
}
