use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, error, warn};

use crate::config::{
    Config, FEED_LIST_TIMEOUT_SECS, FEED_MARKET_TYPES, FEED_MAX_PAGES, FEED_PAGE_DELAY_MS,
    FEED_PAGE_SIZE, FEED_PRICE_TIMEOUT_SECS,
};
use crate::error::{AppError, Result};
use crate::feed::parse::{
    dedup_markets, parse_latest_price, parse_list_page, parse_topic_price, ListPage,
};
use crate::feed::FeedSource;
use crate::types::MarketSnapshot;

/// Client for the Opinion open API plus the topic proxy used as a price fallback.
pub struct OpinionClient {
    client: reqwest::Client,
    /// No auth headers: the proxy is public.
    proxy_client: reqwest::Client,
    base_url: String,
    topic_url: String,
}

impl OpinionClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&cfg.api_key).map_err(|_| {
                AppError::Config("API_KEY contains invalid header characters".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(FEED_LIST_TIMEOUT_SECS))
            .build()?;
        let proxy_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_PRICE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            proxy_client,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            topic_url: cfg.topic_api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_page(&self, market_type: u8, page: usize) -> Result<ListPage> {
        let url = format!("{}/market", self.base_url);
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(&[
                ("page", page.to_string()),
                ("pageSize", FEED_PAGE_SIZE.to_string()),
                ("status", "activated".to_string()),
                ("marketType", market_type.to_string()),
                ("sort", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_list_page(&resp))
    }

    async fn latest_price(&self, token_id: &str) -> Result<Option<f64>> {
        let url = format!("{}/token/latest-price", self.base_url);
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(&[("token_id", token_id)])
            .timeout(Duration::from_secs(FEED_PRICE_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_latest_price(&resp))
    }

    async fn topic_price(&self, market_id: &str, token_id: &str) -> Result<Option<f64>> {
        let url = format!("{}/{}", self.topic_url, market_id);
        let resp = self.proxy_client.get(&url).send().await?;
        if !resp.status().is_success() {
            debug!(market_id, status = %resp.status(), "Topic price lookup returned non-success");
            return Ok(None);
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(parse_topic_price(&body, token_id))
    }
}

#[async_trait]
impl FeedSource for OpinionClient {
    async fn fetch_markets(&self) -> Vec<MarketSnapshot> {
        let mut all = Vec::new();

        for &market_type in FEED_MARKET_TYPES {
            for page in 1..=FEED_MAX_PAGES {
                match self.fetch_page(market_type, page).await {
                    Ok(ListPage::Markets(markets)) => {
                        let n = markets.len();
                        all.extend(markets);
                        if n < FEED_PAGE_SIZE {
                            break;
                        }
                    }
                    Ok(ListPage::ApiError(body)) => {
                        error!("Feed API error for type {market_type} page {page}: {body}");
                        break;
                    }
                    Err(e) => {
                        error!("Feed request failed for type {market_type} page {page}: {e}");
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(FEED_PAGE_DELAY_MS)).await;
            }
        }

        let markets = dedup_markets(all);
        debug!(count = markets.len(), "Fetched market snapshot");
        markets
    }

    async fn fetch_token_price(&self, token_id: &str, market_id_hint: Option<&str>) -> Option<f64> {
        match self.latest_price(token_id).await {
            Ok(Some(price)) => return Some(price),
            Ok(None) => {}
            Err(e) => warn!("Failed to fetch latest price for token {token_id}: {e}"),
        }

        let market_id = market_id_hint?;
        match self.topic_price(market_id, token_id).await {
            Ok(price) => price,
            Err(e) => {
                warn!("Topic price fallback failed for market {market_id}: {e}");
                None
            }
        }
    }
}
