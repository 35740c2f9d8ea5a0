use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BoardResponse {
    pub generated_at: Option<String>,
    pub entries: Vec<BoardEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardEntry {
    pub event_id: String,
    pub title: String,
    pub quote: QuoteView,
    pub demand: DemandView,
    pub insights: Vec<InsightView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteView {
    pub current_amount: i64,
    pub original_amount: Option<i64>,
    pub direction: String,
    pub percent_change: f64,
    pub trend_label: String,
    pub hours_to_event: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemandView {
    pub level: String,
    pub percent_sold: f64,
    pub tickets_remaining: u32,
    pub projected_sellout_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightView {
    pub category: String,
    pub title: String,
    pub message: String,
    pub confidence_percent: u8,
    pub is_urgent: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsResponse {
    pub total_revenue: i64,
    pub tickets_sold: u32,
    pub conversion_rate: f64,
    pub average_ticket_price: i64,
    pub active_users: u32,
    pub bounce_rate: f64,
    pub customer_satisfaction: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub board_cycles: Option<u64>,
    pub notifications_dispatched: Option<u64>,
    pub cache_hits: Option<u64>,
    pub cache_misses: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationView {
    pub kind: String,
    pub title: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub board: BoardResponse,
    pub metrics: Option<MetricsResponse>,
    pub health: HealthResponse,
    pub notifications: Vec<NotificationView>,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            board: BoardResponse::default(),
            metrics: None,
            health: HealthResponse::default(),
            notifications: Vec::new(),
            base_url,
        }
    }

    /// Board entry under the cursor, if any.
    pub fn selected_entry(&self, selected: Option<usize>) -> Option<&BoardEntry> {
        selected.and_then(|i| self.board.entries.get(i))
    }

    /// The board is the core feed; the rest is best-effort and keeps its last
    /// value when a request fails.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let board_url = format!("{}/board", self.base_url);
        let metrics_url = format!("{}/dashboard/metrics", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let notifications_url = format!("{}/notifications", self.base_url);

        let (board_res, metrics_res, health_res, notifications_res) = tokio::join!(
            client.get(&board_url).send(),
            client.get(&metrics_url).send(),
            client.get(&health_url).send(),
            client.get(&notifications_url).send(),
        );

        let board = match board_res {
            Ok(resp) => resp.json::<BoardResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match board {
            Ok(b) => {
                self.board = b;
                self.status = ConnectionStatus::Connected;

                if let Ok(m) = metrics_res {
                    if let Ok(metrics) = m.json::<MetricsResponse>().await {
                        self.metrics = Some(metrics);
                    }
                }
                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
                if let Ok(n) = notifications_res {
                    if let Ok(notifications) = n.json::<Vec<NotificationView>>().await {
                        self.notifications = notifications;
                    }
                }
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Whole rupees with Indian digit grouping, e.g. `₹12,34,567`.
pub fn format_rupees(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            parts.push(&head[end - 2..end]);
            end -= 2;
        }
        parts.push(&head[..end]);
        parts.reverse();
        format!("{},{tail}", parts.join(","))
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}₹{grouped}")
}

/// Arrow plus percent, e.g. `▲ 12.5%`.
pub fn format_change(direction: &str, percent: f64) -> String {
    match direction {
        "up" => format!("▲ {percent:.1}%"),
        "down" => format!("▼ {percent:.1}%"),
        _ => "■ 0.0%".to_string(),
    }
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Time to kickoff, e.g. `5h`, `3d 4h`.
pub fn format_hours(hours: f64) -> String {
    let total = hours.max(0.0).round() as u64;
    match (total / 24, total % 24) {
        (0, h) => format!("{h}h"),
        (d, 0) => format!("{d}d"),
        (d, h) => format!("{d}d {h}h"),
    }
}

/// Cache hit ratio, or `—` before the first lookup.
pub fn format_hit_ratio(hits: Option<u64>, misses: Option<u64>) -> String {
    let hits = hits.unwrap_or(0);
    let total = hits + misses.unwrap_or(0);
    if total == 0 {
        return "—".to_string();
    }
    format!("{:.0}%", hits as f64 / total as f64 * 100.0)
}

/// Char-safe truncation with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
