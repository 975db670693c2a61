pub mod models;
pub mod store;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{LastNotification, PriceSample, SpikeNotificationRecord, SubscriberId};

pub use store::SqliteStore;

/// Durable facts the engine reads and appends. Every write is either an
/// idempotent insert-if-absent or an append; nothing is updated or deleted.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn is_processed(&self, market_id: &str) -> Result<bool>;

    /// Insert-if-absent. A second call for the same id is a no-op.
    async fn mark_processed(&self, market_id: &str, title: &str, now: i64) -> Result<()>;

    async fn list_subscribers(&self) -> Result<Vec<SubscriberId>>;

    /// Returns `true` when the subscriber was not already present.
    async fn add_subscriber(&self, chat_id: SubscriberId, now: i64) -> Result<bool>;

    async fn append_price_sample(&self, sample: &PriceSample) -> Result<()>;

    /// Newest sample for the market taken at or before `cutoff`.
    async fn price_at_or_before(&self, market_id: &str, cutoff: i64) -> Result<Option<f64>>;

    async fn last_notification(&self, market_id: &str) -> Result<Option<LastNotification>>;

    async fn record_notification(&self, record: &SpikeNotificationRecord) -> Result<()>;
}
