pub mod coordinator;
pub mod discovery;
pub mod instruments;
pub mod spike;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub use coordinator::{ScanCoordinator, ScanLaunch, TickReport};
pub use spike::{ScanSummary, SpikeScanner};

/// Source of "now" in Unix seconds. Injected so tests can pin time.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(now_secs)
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
