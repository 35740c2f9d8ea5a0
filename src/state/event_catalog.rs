use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DEFAULT_BASE_PRICE, DEFAULT_POPULARITY};
use crate::types::DemandLevel;

// ---------------------------------------------------------------------------
// EventProfile
// ---------------------------------------------------------------------------

/// Compiled-in constants for one listed event.
#[derive(Debug, Clone, Serialize)]
pub struct EventProfile {
    pub id: &'static str,
    pub title: &'static str,
    pub sport: &'static str,
    pub venue: &'static str,
    /// RFC 3339 kickoff time.
    pub kickoff: &'static str,
    pub base_price: i64,
    /// 0.0–1.0, drives the demand curve and the pricing demand factor.
    pub popularity: f64,
}

impl EventProfile {
    pub fn kickoff_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.kickoff)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn demand_level(&self) -> DemandLevel {
        DemandLevel::from_fraction(self.popularity)
    }
}

const EVENTS: &[EventProfile] = &[
    EventProfile {
        id: "cricket-final",
        title: "Cricket World Cup Final",
        sport: "cricket",
        venue: "Narendra Modi Stadium, Ahmedabad",
        kickoff: "2026-11-22T08:30:00Z",
        base_price: 5000,
        popularity: 0.9,
    },
    EventProfile {
        id: "ipl-opener",
        title: "IPL Season Opener",
        sport: "cricket",
        venue: "Wankhede Stadium, Mumbai",
        kickoff: "2027-03-21T14:00:00Z",
        base_price: 3500,
        popularity: 0.85,
    },
    EventProfile {
        id: "football-derby",
        title: "Kolkata Football Derby",
        sport: "football",
        venue: "Salt Lake Stadium, Kolkata",
        kickoff: "2026-12-05T13:30:00Z",
        base_price: 2500,
        popularity: 0.75,
    },
    EventProfile {
        id: "tennis-open",
        title: "Bengaluru Open Men's Final",
        sport: "tennis",
        venue: "KSLTA Stadium, Bengaluru",
        kickoff: "2027-02-14T11:00:00Z",
        base_price: 4000,
        popularity: 0.65,
    },
    EventProfile {
        id: "hockey-semis",
        title: "Hockey India League Semi-Final",
        sport: "hockey",
        venue: "Kalinga Stadium, Bhubaneswar",
        kickoff: "2027-01-18T12:00:00Z",
        base_price: 1800,
        popularity: 0.45,
    },
    EventProfile {
        id: "kabaddi-league",
        title: "Pro Kabaddi League Matchday",
        sport: "kabaddi",
        venue: "Gachibowli Indoor Stadium, Hyderabad",
        kickoff: "2026-12-12T14:00:00Z",
        base_price: 1200,
        popularity: 0.5,
    },
];

// ---------------------------------------------------------------------------
// EventCatalog
// ---------------------------------------------------------------------------

/// Read-only lookup over the compiled-in event table. Unknown ids fall back to
/// default pricing constants rather than failing.
pub struct EventCatalog {
    events: &'static [EventProfile],
}

impl EventCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, event_id: &str) -> Option<&EventProfile> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn all(&self) -> &[EventProfile] {
        self.events
    }

    pub fn event_ids(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.id).collect()
    }

    pub fn base_price(&self, event_id: &str) -> i64 {
        self.get(event_id).map_or(DEFAULT_BASE_PRICE, |e| e.base_price)
    }

    pub fn popularity(&self, event_id: &str) -> f64 {
        self.get(event_id).map_or(DEFAULT_POPULARITY, |e| e.popularity)
    }

    /// Demand band from popularity, using the default popularity for unknown ids.
    pub fn demand_level(&self, event_id: &str) -> DemandLevel {
        self.get(event_id)
            .map_or_else(|| DemandLevel::from_fraction(DEFAULT_POPULARITY), EventProfile::demand_level)
    }

    /// Display title, falling back to the raw id for unknown events.
    pub fn title(&self, event_id: &str) -> String {
        self.get(event_id)
            .map_or_else(|| event_id.to_string(), |e| e.title.to_string())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self { events: EVENTS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_event_uses_table_constants() {
        let catalog = EventCatalog::new();
        assert_eq!(catalog.base_price("cricket-final"), 5000);
        assert!((catalog.popularity("cricket-final") - 0.9).abs() < 1e-9);
        assert_eq!(catalog.get("cricket-final").unwrap().demand_level(), DemandLevel::High);
        assert_eq!(catalog.demand_level("hockey-semis"), DemandLevel::Low);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn unknown_event_falls_back_to_defaults() {
        let catalog = EventCatalog::new();
        assert!(catalog.get("no-such-match").is_none());
        assert_eq!(catalog.base_price("no-such-match"), DEFAULT_BASE_PRICE);
        assert!((catalog.popularity("no-such-match") - DEFAULT_POPULARITY).abs() < 1e-9);
        assert_eq!(catalog.title("no-such-match"), "no-such-match");
        // 0.6 sits in the medium band
        assert_eq!(catalog.demand_level("no-such-match"), DemandLevel::Medium);
    }

    #[test]
    fn every_kickoff_parses() {
        let catalog = EventCatalog::new();
        for event in catalog.all() {
            assert!(event.kickoff_at().is_some(), "bad kickoff for {}", event.id);
            assert!((0.0..=1.0).contains(&event.popularity));
        }
    }
}
