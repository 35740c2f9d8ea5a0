pub mod clock;
pub mod dashboard;
pub mod demand;
pub mod insight;
pub mod pricing;
pub mod random;

pub use clock::{Clock, SystemClock};
pub use dashboard::DashboardMetricsSimulator;
pub use demand::DemandSimulator;
pub use insight::InsightGenerator;
pub use pricing::PricingSimulator;
pub use random::{RandomSource, SeededSource};
