pub mod health;
pub mod latency;
pub mod routes;

pub use health::HealthState;
pub use latency::ScanLatency;
pub use routes::{router, ApiState};
