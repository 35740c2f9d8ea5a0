use crate::error::{AppError, Result};

/// Event board refresh interval (seconds). Covers prices, demand and insights.
pub const EVENT_POLL_INTERVAL_SECS: u64 = 30;

/// Dashboard metrics refresh interval (seconds).
pub const DASHBOARD_POLL_INTERVAL_SECS: u64 = 300;

/// Dashboard metrics stay valid this long after their write timestamp.
pub const METRICS_CACHE_TTL_SECS: i64 = 300;

/// Persisted cache keys for the dashboard snapshot and its write time (epoch millis).
pub const METRICS_CACHE_KEY: &str = "dashboard_metrics";
pub const METRICS_CACHE_TIMESTAMP_KEY: &str = "dashboard_metrics_timestamp";

/// Channel capacity for internal message routing.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Recent notifications kept for `GET /notifications`.
pub const NOTIFICATION_FEED_LEN: usize = 100;

/// Random time-to-event draws fall in [0, MAX_RANDOM_HOURS_TO_EVENT).
pub const MAX_RANDOM_HOURS_TO_EVENT: f64 = 720.0;

/// Catalog fallbacks for ids that are not in the compiled-in table.
pub const DEFAULT_BASE_PRICE: i64 = 2000;
pub const DEFAULT_POPULARITY: f64 = 0.6;

/// Demand level thresholds applied to a sold fraction (or popularity).
pub mod demand_thresholds {
    pub const HIGH_ABOVE: f64 = 0.8;
    pub const MEDIUM_ABOVE: f64 = 0.5;
    pub const MIN_SOLD: f64 = 0.10;
    pub const MAX_SOLD: f64 = 0.98;
}

/// Pricing multiplier adjustments.
pub mod pricing_factors {
    pub const SURGE_UNDER_HOURS: f64 = 24.0;
    pub const SURGE_BONUS: f64 = 0.2;
    pub const WEEK_UNDER_HOURS: f64 = 168.0;
    pub const WEEK_BONUS: f64 = 0.1;
    pub const HIGH_DEMAND_BONUS: f64 = 0.15;
    pub const LOW_DEMAND_PENALTY: f64 = 0.1;
    /// Volatility noise is uniform in [-VOLATILITY, VOLATILITY].
    pub const VOLATILITY: f64 = 0.025;
}

/// Insight rule thresholds.
pub mod insight_thresholds {
    pub const SURGE_PERCENT: f64 = 10.0;
    pub const SURGE_URGENT_PERCENT: f64 = 20.0;
    pub const DROP_PERCENT: f64 = 5.0;
    pub const LIMITED_TICKETS: u32 = 100;
    pub const LIMITED_URGENT_TICKETS: u32 = 50;
    pub const MATCH_DRAW_ABOVE: f64 = 0.7;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Seed for the shared random source (SIM_SEED). Unset = entropy.
    pub sim_seed: Option<u64>,
    /// Artificial response delay range in ms (SIM_LATENCY_MIN_MS / SIM_LATENCY_MAX_MS)
    pub sim_latency_min_ms: u64,
    pub sim_latency_max_ms: u64,
    /// Event board poll period (EVENT_POLL_SECS)
    pub event_poll_secs: u64,
    /// Dashboard metrics poll period (DASHBOARD_POLL_SECS)
    pub dashboard_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let sim_latency_min_ms = std::env::var("SIM_LATENCY_MIN_MS")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<u64>()
            .unwrap_or(50);
        let sim_latency_max_ms = std::env::var("SIM_LATENCY_MAX_MS")
            .unwrap_or_else(|_| "250".to_string())
            .parse::<u64>()
            .unwrap_or(250);
        if sim_latency_min_ms > sim_latency_max_ms {
            return Err(AppError::Config(
                "SIM_LATENCY_MIN_MS must not exceed SIM_LATENCY_MAX_MS".to_string(),
            ));
        }

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "insights.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            sim_seed: match std::env::var("SIM_SEED") {
                Ok(raw) => Some(
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| AppError::Config("SIM_SEED must be an unsigned integer".to_string()))?,
                ),
                Err(_) => None,
            },
            sim_latency_min_ms,
            sim_latency_max_ms,
            event_poll_secs: std::env::var("EVENT_POLL_SECS")
                .unwrap_or_else(|_| EVENT_POLL_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(EVENT_POLL_INTERVAL_SECS)
                .max(1),
            dashboard_poll_secs: std::env::var("DASHBOARD_POLL_SECS")
                .unwrap_or_else(|_| DASHBOARD_POLL_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(DASHBOARD_POLL_INTERVAL_SECS)
                .max(1),
        })
    }
}
