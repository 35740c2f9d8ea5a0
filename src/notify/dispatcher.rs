use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::types::{DeliveredNotification, Notification, NotificationKind};

/// Bounded, newest-last list of delivered notifications read by the API.
pub struct NotificationFeed {
    recent: Mutex<VecDeque<DeliveredNotification>>,
    capacity: usize,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    pub fn push(&self, n: DeliveredNotification) {
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(n);
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<DeliveredNotification> {
        let recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        recent.iter().rev().cloned().collect()
    }
}

/// Receives semantic notifications from the poller and the ticket endpoint,
/// renders them by kind, logs them, and appends them to the feed.
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<Notification>,
    feed: Arc<NotificationFeed>,
    health: Arc<HealthState>,
}

impl NotificationDispatcher {
    pub fn new(
        rx: mpsc::Receiver<Notification>,
        feed: Arc<NotificationFeed>,
        health: Arc<HealthState>,
    ) -> Self {
        Self { rx, feed, health }
    }

    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            let delivered = render(&notification);
            info!(
                event = "NOTIFICATION",
                kind = %delivered.kind,
                title = %delivered.title,
                "{}",
                delivered.body,
            );
            self.health.inc_notifications_dispatched();
            self.feed.push(delivered);
        }
        warn!("notification channel closed, dispatcher stopping");
    }
}

/// Build a notification with the current time.
pub fn notification(kind: NotificationKind, data: Value) -> Notification {
    Notification {
        kind,
        data,
        created_at: Utc::now(),
    }
}

/// Turns the free-form payload into display text. Missing fields degrade to
/// generic wording rather than failing.
pub fn render(n: &Notification) -> DeliveredNotification {
    let text = |key: &str, fallback: &str| -> String {
        match n.data.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(num)) => num.to_string(),
            _ => fallback.to_string(),
        }
    };
    let event_title = text("eventTitle", "your event");

    let (title, body) = match n.kind {
        NotificationKind::BookingConfirmed => (
            "Booking Confirmed!".to_string(),
            format!(
                "Your tickets for {event_title} are confirmed. Booking ref: {}",
                text("bookingRef", "pending")
            ),
        ),
        NotificationKind::MatchReminder => {
            let hours = n.data.get("hoursToEvent").and_then(Value::as_f64).unwrap_or(0.0);
            (
                "Match Reminder".to_string(),
                format!(
                    "{event_title} starts in {} hours at {}",
                    hours.round() as i64,
                    text("venue", "the venue")
                ),
            )
        }
        NotificationKind::PriceDrop => (
            "Price Drop Alert".to_string(),
            format!(
                "{event_title} tickets dropped to ₹{} (was ₹{})",
                text("newPrice", "?"),
                text("oldPrice", "?")
            ),
        ),
    };

    DeliveredNotification {
        kind: n.kind,
        title,
        body,
        created_at: n.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_each_kind() {
        let booking = render(&notification(
            NotificationKind::BookingConfirmed,
            json!({ "eventTitle": "Cricket World Cup Final", "bookingRef": "BK-1234" }),
        ));
        assert_eq!(booking.title, "Booking Confirmed!");
        assert!(booking.body.contains("BK-1234"));

        let reminder = render(&notification(
            NotificationKind::MatchReminder,
            json!({ "eventTitle": "Derby", "venue": "Salt Lake Stadium", "hoursToEvent": 5.6 }),
        ));
        assert_eq!(reminder.body, "Derby starts in 6 hours at Salt Lake Stadium");

        let drop = render(&notification(
            NotificationKind::PriceDrop,
            json!({ "eventTitle": "Derby", "oldPrice": 2500, "newPrice": 2200 }),
        ));
        assert_eq!(drop.body, "Derby tickets dropped to ₹2200 (was ₹2500)");
    }

    #[test]
    fn missing_fields_degrade() {
        let n = render(&notification(NotificationKind::BookingConfirmed, json!({})));
        assert_eq!(n.body, "Your tickets for your event are confirmed. Booking ref: pending");
    }

    #[test]
    fn feed_is_bounded_and_newest_first() {
        let feed = NotificationFeed::new(2);
        for i in 0..3 {
            feed.push(render(&notification(
                NotificationKind::BookingConfirmed,
                json!({ "bookingRef": format!("BK-{i}") }),
            )));
        }
        let items = feed.snapshot();
        assert_eq!(items.len(), 2);
        assert!(items[0].body.ends_with("BK-2"));
        assert!(items[1].body.ends_with("BK-1"));
    }

    #[tokio::test]
    async fn dispatcher_drains_channel_into_feed() {
        let (tx, rx) = mpsc::channel(4);
        let feed = NotificationFeed::new(10);
        let health = Arc::new(HealthState::new());
        let dispatcher = NotificationDispatcher::new(rx, feed.clone(), health.clone());

        tx.send(notification(NotificationKind::PriceDrop, json!({ "eventTitle": "Final" })))
            .await
            .unwrap();
        drop(tx);
        dispatcher.run().await;

        assert_eq!(feed.snapshot().len(), 1);
        assert_eq!(health.notifications_dispatched(), 1);
    }
}
