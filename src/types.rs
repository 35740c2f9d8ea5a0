use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::demand_thresholds::{HIGH_ABOVE, MEDIUM_ABOVE};

// ---------------------------------------------------------------------------
// Demand level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

impl DemandLevel {
    /// `> 0.8` → high, `> 0.5` → medium, else low. Used for both sold fractions
    /// and catalog popularity.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction > HIGH_ABOVE {
            DemandLevel::High
        } else if fraction > MEDIUM_ABOVE {
            DemandLevel::Medium
        } else {
            DemandLevel::Low
        }
    }
}

impl std::fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DemandLevel::High => "high",
            DemandLevel::Medium => "medium",
            DemandLevel::Low => "low",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Up,
    Down,
    Stable,
}

impl PriceDirection {
    pub fn between(current: i64, base: i64) -> Self {
        match current.cmp(&base) {
            std::cmp::Ordering::Greater => PriceDirection::Up,
            std::cmp::Ordering::Less => PriceDirection::Down,
            std::cmp::Ordering::Equal => PriceDirection::Stable,
        }
    }
}

impl std::fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriceDirection::Up => "up",
            PriceDirection::Down => "down",
            PriceDirection::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

/// Synthetic price for one event. Recomputed on every call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub event_id: String,
    pub current_amount: i64,
    /// Base price, present whenever the current amount differs from it.
    pub original_amount: Option<i64>,
    pub direction: PriceDirection,
    /// Absolute change relative to base, in percent, one decimal.
    pub percent_change: f64,
    pub trend_label: String,
    pub hours_to_event: f64,
}

// ---------------------------------------------------------------------------
// Demand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSnapshot {
    pub event_id: String,
    pub level: DemandLevel,
    /// Always within [0.10, 0.98].
    pub percent_sold: f64,
    pub tickets_sold: u32,
    pub tickets_remaining: u32,
    pub total_tickets: u32,
    pub projected_sellout_text: String,
    pub hours_to_event: f64,
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Pricing,
    Demand,
    Recommendation,
    Alert,
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InsightCategory::Pricing => "pricing",
            InsightCategory::Demand => "demand",
            InsightCategory::Recommendation => "recommendation",
            InsightCategory::Alert => "alert",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub event_id: String,
    pub category: InsightCategory,
    pub title: String,
    pub message: String,
    pub confidence_percent: u8,
    pub created_at: DateTime<Utc>,
    pub is_urgent: bool,
}

/// Everything the storefront shows for one event in a single poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBoardEntry {
    pub event_id: String,
    pub title: String,
    pub quote: PriceQuote,
    pub demand: DemandSnapshot,
    pub insights: Vec<Insight>,
}

/// Output of one event-board poll cycle, fanned out to subscribers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBoard {
    pub generated_at: Option<DateTime<Utc>>,
    pub entries: Vec<EventBoardEntry>,
}

// ---------------------------------------------------------------------------
// Dashboard metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPrediction {
    pub event_name: String,
    pub predicted_sales: u32,
    pub confidence_percent: u8,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessInsight {
    pub kind: String,
    pub message: String,
    pub recommended_action: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetricsSnapshot {
    pub total_revenue: i64,
    pub tickets_sold: u32,
    /// Percent, one decimal.
    pub conversion_rate: f64,
    pub average_ticket_price: i64,
    pub active_users: u32,
    pub page_views: u32,
    /// Percent, one decimal.
    pub bounce_rate: f64,
    /// Out of 5, one decimal.
    pub customer_satisfaction: f64,
    pub sales_predictions: Vec<SalesPrediction>,
    pub insights: Vec<BusinessInsight>,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    MatchReminder,
    PriceDrop,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::MatchReminder => "match_reminder",
            NotificationKind::PriceDrop => "price_drop",
        };
        write!(f, "{s}")
    }
}

/// Semantic notification handed to the dispatcher. `data` is free-form and
/// interpreted per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A notification after the dispatcher rendered it for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_level_thresholds_are_exclusive() {
        assert_eq!(DemandLevel::from_fraction(0.81), DemandLevel::High);
        assert_eq!(DemandLevel::from_fraction(0.8), DemandLevel::Medium);
        assert_eq!(DemandLevel::from_fraction(0.51), DemandLevel::Medium);
        assert_eq!(DemandLevel::from_fraction(0.5), DemandLevel::Low);
    }

    #[test]
    fn direction_follows_sign_of_difference() {
        assert_eq!(PriceDirection::between(2100, 2000), PriceDirection::Up);
        assert_eq!(PriceDirection::between(1900, 2000), PriceDirection::Down);
        assert_eq!(PriceDirection::between(2000, 2000), PriceDirection::Stable);
    }

    #[test]
    fn notification_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::BookingConfirmed).unwrap();
        assert_eq!(json, "\"booking_confirmed\"");
        assert_eq!(NotificationKind::PriceDrop.to_string(), "price_drop");
    }
}
