pub mod client;
pub mod parse;

use async_trait::async_trait;

use crate::types::MarketSnapshot;

pub use client::OpinionClient;

/// Upstream market feed. Both calls are best-effort: failures are logged by the
/// implementation and surface as empty or missing data, never as errors.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Full snapshot of listed markets. Partial or empty on upstream trouble.
    async fn fetch_markets(&self) -> Vec<MarketSnapshot>;

    /// Latest price of a token, `None` when no source could provide one.
    async fn fetch_token_price(&self, token_id: &str, market_id_hint: Option<&str>) -> Option<f64>;
}
