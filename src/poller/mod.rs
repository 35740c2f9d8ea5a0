pub mod polling_hub;

pub use polling_hub::{MetricsSender, PollSubscriptions, PollingHub};
