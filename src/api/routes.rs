use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{CycleKind, CycleLatency, LatencySummary};
use crate::db::KvStore;
use crate::engine::Engine;
use crate::error::AppError;
use crate::export::calendar::{links, to_ics};
use crate::export::qr::issue_ticket;
use crate::export::{CalendarEvent, CalendarLinks, TicketQrPayload, TicketRequest};
use crate::notify::dispatcher::notification;
use crate::notify::NotificationFeed;
use crate::poller::{MetricsSender, PollSubscriptions};
use crate::sim::dashboard::is_fresh;
use crate::sim::RandomSource;
use crate::state::EventProfile;
use crate::types::{
    DashboardMetricsSnapshot, DeliveredNotification, DemandSnapshot, EventBoard, Insight, Notification,
    NotificationKind, PriceQuote,
};

pub struct ApiState<S: KvStore> {
    pub engine: Arc<Engine<S>>,
    pub subscriptions: PollSubscriptions,
    pub feed: Arc<NotificationFeed>,
    pub health: Arc<HealthState>,
    pub latency: Arc<CycleLatency>,
    pub notify_tx: mpsc::Sender<Notification>,
    pub metrics_tx: Arc<MetricsSender>,
    /// Drives simulated network delay only; the engine's stream stays untouched.
    pub latency_rng: Arc<dyn RandomSource>,
    /// Simulated network delay range for on-demand endpoints.
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
}

// Manual impl so `S` itself need not be Clone.
impl<S: KvStore> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            subscriptions: self.subscriptions.clone(),
            feed: Arc::clone(&self.feed),
            health: Arc::clone(&self.health),
            latency: Arc::clone(&self.latency),
            notify_tx: self.notify_tx.clone(),
            metrics_tx: Arc::clone(&self.metrics_tx),
            latency_rng: Arc::clone(&self.latency_rng),
            latency_min_ms: self.latency_min_ms,
            latency_max_ms: self.latency_max_ms,
        }
    }
}

impl<S: KvStore> ApiState<S> {
    async fn simulate_network(&self) {
        if self.latency_max_ms == 0 {
            return;
        }
        let ms = self
            .latency_rng
            .uniform(self.latency_min_ms as f64, self.latency_max_ms as f64);
        tokio::time::sleep(Duration::from_millis(ms.round() as u64)).await;
    }

    fn profile(&self, event_id: &str) -> Result<&EventProfile, AppError> {
        self.engine
            .catalog
            .get(event_id)
            .ok_or_else(|| AppError::UnknownEvent(event_id.to_string()))
    }
}

pub fn router<S: KvStore + 'static>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/health", get(get_health::<S>))
        .route("/events", get(get_events::<S>))
        .route("/events/:id/price", get(get_event_price::<S>))
        .route("/events/:id/demand", get(get_event_demand::<S>))
        .route("/events/:id/insights", get(get_event_insights::<S>))
        .route("/events/:id/calendar.ics", get(get_event_calendar_ics::<S>))
        .route("/events/:id/calendar/links", get(get_event_calendar_links::<S>))
        .route("/events/:id/tickets", post(post_event_ticket::<S>))
        .route("/tickets/verify", post(post_ticket_verify))
        .route("/board", get(get_board::<S>))
        .route("/dashboard/metrics", get(get_dashboard_metrics::<S>))
        .route("/dashboard/metrics/refresh", post(post_dashboard_refresh::<S>))
        .route("/notifications", get(get_notifications::<S>))
        .route("/stats/latency", get(get_stats_latency::<S>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct HoursQuery {
    /// Pins time-to-event; drawn at random when absent.
    pub hours: Option<f64>,
}

impl HoursQuery {
    fn validated(&self) -> Result<Option<f64>, AppError> {
        match self.hours {
            Some(h) if !h.is_finite() || h < 0.0 => Err(AppError::Validation(format!(
                "hours must be a non-negative number, got {h}"
            ))),
            other => Ok(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub events: usize,
    pub board_cycles: u64,
    pub dashboard_cycles: u64,
    pub last_board_at_ms: u64,
    pub notifications_dispatched: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: TicketQrPayload,
    /// Exact text to encode into the QR image.
    pub qr_text: String,
}

#[derive(Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub board: LatencySummary,
    pub dashboard: LatencySummary,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health<S: KvStore>(State(state): State<ApiState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        events: state.engine.catalog.len(),
        board_cycles: state.health.board_cycles(),
        dashboard_cycles: state.health.dashboard_cycles(),
        last_board_at_ms: state.health.last_board_at_ms(),
        notifications_dispatched: state.health.notifications_dispatched(),
        cache_hits: state.engine.dashboard.cache_hits(),
        cache_misses: state.engine.dashboard.cache_misses(),
    })
}

async fn get_events<S: KvStore>(State(state): State<ApiState<S>>) -> Json<Vec<EventProfile>> {
    Json(state.engine.catalog.all().to_vec())
}

async fn get_event_price<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
    Query(params): Query<HoursQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    let hours = params.validated()?;
    state.simulate_network().await;

    let quote = match hours {
        Some(h) => state.engine.pricing.quote_at(&event_id, h),
        None => state.engine.pricing.quote(&event_id),
    };
    Ok(Json(quote))
}

async fn get_event_demand<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
    Query(params): Query<HoursQuery>,
) -> Result<Json<DemandSnapshot>, AppError> {
    let hours = params.validated()?;
    state.simulate_network().await;

    let snapshot = match hours {
        Some(h) => state.engine.demand.snapshot_at(&event_id, h),
        None => state.engine.demand.snapshot(&event_id),
    };
    Ok(Json(snapshot))
}

async fn get_event_insights<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
    Query(params): Query<HoursQuery>,
) -> Result<Json<Vec<Insight>>, AppError> {
    let hours = params.validated()?;
    state.simulate_network().await;

    Ok(Json(state.engine.board_entry(&event_id, hours).insights))
}

/// Last board published by the polling hub. Stable between poll cycles.
async fn get_board<S: KvStore>(State(state): State<ApiState<S>>) -> Json<EventBoard> {
    Json(state.subscriptions.board.borrow().as_ref().clone())
}

/// Serves the hub's last published metrics while they are within the cache
/// TTL; otherwise goes through the cache and republishes the result.
async fn get_dashboard_metrics<S: KvStore>(
    State(state): State<ApiState<S>>,
) -> Json<DashboardMetricsSnapshot> {
    state.simulate_network().await;

    let published = state.subscriptions.metrics.borrow().clone();
    if let Some(metrics) = published {
        if is_fresh(metrics.generated_at, state.engine.clock.now()) {
            return Json(metrics.as_ref().clone());
        }
    }

    let metrics = state.engine.dashboard.current().await;
    state.metrics_tx.send_replace(Some(Arc::new(metrics.clone())));
    Json(metrics)
}

async fn post_dashboard_refresh<S: KvStore>(
    State(state): State<ApiState<S>>,
) -> Json<DashboardMetricsSnapshot> {
    state.engine.dashboard.invalidate().await;
    let metrics = state.engine.dashboard.current().await;
    info!(
        event = "METRICS_REFRESHED",
        revenue = metrics.total_revenue,
        "dashboard cache invalidated and rebuilt"
    );
    state.metrics_tx.send_replace(Some(Arc::new(metrics.clone())));
    Json(metrics)
}

fn calendar_event(profile: &EventProfile) -> Result<CalendarEvent, AppError> {
    let start = profile
        .kickoff_at()
        .ok_or_else(|| AppError::Validation(format!("event {} has no valid kickoff time", profile.id)))?;
    Ok(CalendarEvent {
        uid: format!("{}@matchday-insights", profile.id),
        title: profile.title.to_string(),
        venue: profile.venue.to_string(),
        description: format!("Live {} at {}. Gates open 90 minutes before kickoff.", profile.sport, profile.venue),
        start,
    })
}

async fn get_event_calendar_ics<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = calendar_event(state.profile(&event_id)?)?;
    let ics = to_ics(&event, state.engine.clock.now());
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{event_id}.ics\""),
            ),
        ],
        ics,
    ))
}

async fn get_event_calendar_links<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
) -> Result<Json<CalendarLinks>, AppError> {
    let event = calendar_event(state.profile(&event_id)?)?;
    Ok(Json(links(&event)))
}

async fn post_event_ticket<S: KvStore>(
    State(state): State<ApiState<S>>,
    Path(event_id): Path<String>,
    Json(request): Json<TicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), AppError> {
    let profile = state.profile(&event_id)?;
    state.simulate_network().await;

    let ticket = issue_ticket(profile, &request, state.engine.rng.as_ref(), state.engine.clock.now())?;
    info!(
        event = "TICKET_ISSUED",
        event_id = %ticket.event_id,
        ticket_id = %ticket.ticket_id,
        booking_ref = %ticket.booking_ref,
        "ticket issued"
    );

    let confirmed = notification(
        NotificationKind::BookingConfirmed,
        json!({
            "eventId": ticket.event_id,
            "eventTitle": ticket.event_title,
            "bookingRef": ticket.booking_ref,
            "ticketId": ticket.ticket_id,
            "venue": ticket.venue,
            "seat": ticket.seat,
        }),
    );
    if let Err(e) = state.notify_tx.try_send(confirmed) {
        warn!("notification channel full, dropping booking confirmation: {e}");
    }

    let qr_text = ticket.to_qr_text()?;
    Ok((StatusCode::CREATED, Json(TicketResponse { ticket, qr_text })))
}

async fn post_ticket_verify(Json(ticket): Json<TicketQrPayload>) -> Json<VerifyResponse> {
    let valid = ticket.verify();
    if !valid {
        warn!(event = "TICKET_REJECTED", ticket_id = %ticket.ticket_id, "verification code mismatch");
    }
    Json(VerifyResponse { valid })
}

async fn get_notifications<S: KvStore>(
    State(state): State<ApiState<S>>,
) -> Json<Vec<DeliveredNotification>> {
    Json(state.feed.snapshot())
}

async fn get_stats_latency<S: KvStore>(State(state): State<ApiState<S>>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        board: state.latency.summary(CycleKind::Board),
        dashboard: state.latency.summary(CycleKind::Dashboard),
    })
}
